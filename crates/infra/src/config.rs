//! Configuration loading and representation.
//!
//! Everything comes from the environment (optionally seeded from a `.env`
//! file). Missing or inconsistent security settings are fatal at startup.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use keystone_auth::{
    KeyError, PermissionTable, PermissionTableError, SigningSecret, ensure_disjoint,
};

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 24 * 60 * 60;
pub const DEFAULT_INTERNAL_TOKEN_TTL_SECS: i64 = 5 * 60;
pub const DEFAULT_REVOCATION_TIMEOUT_MS: u64 = 250;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5_000;
/// Upper bound for any credential lifetime: one year.
pub const MAX_TOKEN_TTL_SECS: i64 = 366 * 24 * 60 * 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },

    #[error("signing secrets: {0}")]
    Key(#[from] KeyError),

    #[error("failed to read permission table {path}: {source}")]
    PermissionTableRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to load permission table {path}: {source}")]
    PermissionTable {
        path: PathBuf,
        source: PermissionTableError,
    },
}

/// Process configuration shared by the gateway and downstream services.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub user_secret: SigningSecret,
    pub internal_secret: SigningSecret,
    pub token_ttl: chrono::Duration,
    pub internal_token_ttl: chrono::Duration,
    pub token_leeway: chrono::Duration,
    pub redis_url: String,
    pub revocation_timeout: Duration,
    pub request_timeout: Duration,
    pub permission_table_path: Option<PathBuf>,
}

impl AppConfig {
    /// Load from the process environment (after applying `.env`, if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup (tests pass a map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let user_secret = SigningSecret::new(
            get("USER_TOKEN_SECRET").ok_or(ConfigError::Missing("USER_TOKEN_SECRET"))?,
        )?;
        let internal_secret = SigningSecret::new(
            get("INTERNAL_TOKEN_SECRET").ok_or(ConfigError::Missing("INTERNAL_TOKEN_SECRET"))?,
        )?;
        ensure_disjoint(&user_secret, &internal_secret)?;

        let redis_url = get("REDIS_URL").ok_or(ConfigError::Missing("REDIS_URL"))?;

        let bind_addr: SocketAddr = get("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                var: "BIND_ADDR",
                reason: e.to_string(),
            })?;

        let token_ttl = positive_secs(&get, "TOKEN_TTL_SECS", DEFAULT_TOKEN_TTL_SECS)?;
        let internal_token_ttl = positive_secs(
            &get,
            "INTERNAL_TOKEN_TTL_SECS",
            DEFAULT_INTERNAL_TOKEN_TTL_SECS,
        )?;
        let leeway_secs: u32 = parse_or(&get, "TOKEN_LEEWAY_SECS", 0)?;
        let token_leeway = chrono::Duration::seconds(leeway_secs.into());

        let revocation_timeout = Duration::from_millis(parse_or(
            &get,
            "REVOCATION_TIMEOUT_MS",
            DEFAULT_REVOCATION_TIMEOUT_MS,
        )?);
        let request_timeout = Duration::from_millis(parse_or(
            &get,
            "REQUEST_TIMEOUT_MS",
            DEFAULT_REQUEST_TIMEOUT_MS,
        )?);
        if revocation_timeout.is_zero() || revocation_timeout >= request_timeout {
            return Err(ConfigError::Invalid {
                var: "REVOCATION_TIMEOUT_MS",
                reason: format!(
                    "must be non-zero and below REQUEST_TIMEOUT_MS ({} ms)",
                    request_timeout.as_millis()
                ),
            });
        }

        Ok(Self {
            bind_addr,
            user_secret,
            internal_secret,
            token_ttl,
            internal_token_ttl,
            token_leeway,
            redis_url,
            revocation_timeout,
            request_timeout,
            permission_table_path: get("PERMISSION_TABLE_PATH").map(PathBuf::from),
        })
    }
}

fn parse_or<T, G>(get: &G, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(var) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn positive_secs<G>(
    get: &G,
    var: &'static str,
    default: i64,
) -> Result<chrono::Duration, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let secs: i64 = parse_or(get, var, default)?;
    if secs <= 0 || secs > MAX_TOKEN_TTL_SECS {
        return Err(ConfigError::Invalid {
            var,
            reason: format!("must be between 1 and {MAX_TOKEN_TTL_SECS} seconds"),
        });
    }
    chrono::Duration::try_seconds(secs).ok_or(ConfigError::Invalid {
        var,
        reason: "out of range".to_string(),
    })
}

/// The permission table every service must agree on.
///
/// Reads `PERMISSION_TABLE_PATH` when configured, otherwise the compiled-in
/// standard table.
pub fn load_permission_table(config: &AppConfig) -> Result<PermissionTable, ConfigError> {
    let table = match &config.permission_table_path {
        Some(path) => {
            let document = std::fs::read_to_string(path).map_err(|source| {
                ConfigError::PermissionTableRead {
                    path: path.clone(),
                    source,
                }
            })?;
            PermissionTable::from_json(&document).map_err(|source| ConfigError::PermissionTable {
                path: path.clone(),
                source,
            })?
        }
        None => PermissionTable::standard(),
    };

    tracing::info!(
        version = table.version(),
        roles = table.roles().count(),
        "permission table loaded"
    );
    Ok(table)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    const BASE: &[(&str, &str)] = &[
        ("USER_TOKEN_SECRET", "user-secret"),
        ("INTERNAL_TOKEN_SECRET", "internal-secret"),
        ("REDIS_URL", "redis://127.0.0.1:6379"),
    ];

    fn with(extra: &[(&'static str, &'static str)]) -> Vec<(&'static str, &'static str)> {
        let mut pairs: Vec<_> = BASE.to_vec();
        pairs.extend_from_slice(extra);
        pairs
    }

    #[test]
    fn defaults_apply() {
        let cfg = AppConfig::from_lookup(env(BASE)).unwrap();
        assert_eq!(cfg.token_ttl, chrono::Duration::hours(24));
        assert_eq!(cfg.internal_token_ttl, chrono::Duration::minutes(5));
        assert_eq!(cfg.token_leeway, chrono::Duration::zero());
        assert_eq!(cfg.revocation_timeout, Duration::from_millis(250));
        assert_eq!(cfg.bind_addr.port(), 8080);
        assert!(cfg.permission_table_path.is_none());
    }

    #[test]
    fn secrets_are_required() {
        let err = AppConfig::from_lookup(env(&[
            ("INTERNAL_TOKEN_SECRET", "x"),
            ("REDIS_URL", "redis://r"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Missing("USER_TOKEN_SECRET")));

        let err = AppConfig::from_lookup(env(&[
            ("USER_TOKEN_SECRET", "x"),
            ("REDIS_URL", "redis://r"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Missing("INTERNAL_TOKEN_SECRET")));

        let err = AppConfig::from_lookup(env(&[
            ("USER_TOKEN_SECRET", "   "),
            ("INTERNAL_TOKEN_SECRET", "x"),
            ("REDIS_URL", "redis://r"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Missing("USER_TOKEN_SECRET")));
    }

    #[test]
    fn shared_secret_is_rejected() {
        let err = AppConfig::from_lookup(env(&[
            ("USER_TOKEN_SECRET", "same"),
            ("INTERNAL_TOKEN_SECRET", "same"),
            ("REDIS_URL", "redis://r"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Key(KeyError::Shared)));
    }

    #[test]
    fn redis_url_is_required() {
        let err = AppConfig::from_lookup(env(&[
            ("USER_TOKEN_SECRET", "a"),
            ("INTERNAL_TOKEN_SECRET", "b"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Missing("REDIS_URL")));
    }

    #[test]
    fn ttl_must_be_positive() {
        let err = AppConfig::from_lookup(env(&with(&[("TOKEN_TTL_SECS", "0")]))).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "TOKEN_TTL_SECS", .. }));

        let err = AppConfig::from_lookup(env(&with(&[("TOKEN_TTL_SECS", "soon")]))).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "TOKEN_TTL_SECS", .. }));

        let cfg = AppConfig::from_lookup(env(&with(&[("TOKEN_TTL_SECS", "3600")]))).unwrap();
        assert_eq!(cfg.token_ttl, chrono::Duration::hours(1));
    }

    #[test]
    fn ttl_has_an_upper_bound() {
        for huge in ["9000000000000", "9300000000000000", "9223372036854775807"] {
            let err = AppConfig::from_lookup(env(&with(&[("TOKEN_TTL_SECS", huge)]))).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid { var: "TOKEN_TTL_SECS", .. }));

            let err = AppConfig::from_lookup(env(&with(&[("INTERNAL_TOKEN_TTL_SECS", huge)])))
                .unwrap_err();
            assert!(matches!(
                err,
                ConfigError::Invalid {
                    var: "INTERNAL_TOKEN_TTL_SECS",
                    ..
                }
            ));
        }

        let cfg = AppConfig::from_lookup(env(&with(&[("TOKEN_TTL_SECS", "31622400")]))).unwrap();
        assert_eq!(cfg.token_ttl.num_seconds(), MAX_TOKEN_TTL_SECS);
    }

    #[test]
    fn revocation_timeout_must_be_below_request_deadline() {
        let err = AppConfig::from_lookup(env(&with(&[
            ("REVOCATION_TIMEOUT_MS", "5000"),
            ("REQUEST_TIMEOUT_MS", "5000"),
        ])))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "REVOCATION_TIMEOUT_MS", .. }));
    }

    #[test]
    fn permission_table_falls_back_to_standard() {
        let cfg = AppConfig::from_lookup(env(BASE)).unwrap();
        assert_eq!(load_permission_table(&cfg).unwrap(), PermissionTable::standard());
    }

    #[test]
    fn permission_table_reads_configured_file() {
        let path = std::env::temp_dir().join(format!("keystone-table-{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "version": 9, "roles": { "auditor": ["crm:read_customer"] } }"#)
            .unwrap();

        let mut cfg = AppConfig::from_lookup(env(BASE)).unwrap();
        cfg.permission_table_path = Some(path.clone());
        let table = load_permission_table(&cfg).unwrap();
        assert_eq!(table.version(), 9);

        cfg.permission_table_path = Some(path.with_extension("missing"));
        assert!(matches!(
            load_permission_table(&cfg),
            Err(ConfigError::PermissionTableRead { .. })
        ));

        let _ = std::fs::remove_file(path);
    }
}

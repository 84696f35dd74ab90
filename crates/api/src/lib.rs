//! HTTP gateway: guard middleware, routing, and request/response mapping.

pub mod app;
pub mod context;
pub mod middleware;

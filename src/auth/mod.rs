pub mod middleware;
pub mod routes;
pub mod service;
pub mod session;

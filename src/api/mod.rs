pub mod auth;
pub mod contacts;
pub mod emergency;
pub mod location;
pub mod middleware;

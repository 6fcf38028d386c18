//! Client Module
//!
//! HTTP transport and client construction.

pub mod builder;
pub mod http;

pub use builder::ClientBuilder;
pub use http::HttpClient;

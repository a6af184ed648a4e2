//! HTTP implementation of the route service gateway.

pub mod client;
pub mod config;

pub use client::ApiClient;
pub use config::Config;

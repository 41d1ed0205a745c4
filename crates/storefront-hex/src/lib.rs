//! storefront-hex: cart, order and recommendation services plus the inbound HTTP adapter

pub mod config;
pub mod errors;

pub mod application;

pub use storefront_types::{domain, ports};

pub mod inbound; // HTTP adapter (server + handlers)

pub mod chain;
pub mod config;
pub mod error;
pub mod headers;
pub mod model;

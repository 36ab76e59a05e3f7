//! Data models and structures for the network status checker

pub mod config;
pub mod records;

// Re-export main model types
pub use config::{Config, Endpoints};
pub use records::{FreedomReport, IpEndpoint, IpReport, StreamingReport, StreamingStatus};

// Re-export all items from the submodules
mod client_config;
mod error;
mod legacy;
mod remove_conf;

// Re-export client config
pub use client_config::{
    ClientConfig,
    Compressor,
    load_or_default,
};

// Re-export exclusion config
pub use error::ConfigError;
pub use remove_conf::{
    BlacklistReport,
    ConfFormat,
    Patterns,
    RemoveConf,
    RemoveConfLoader,
};

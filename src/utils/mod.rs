//! Helpers shared by the collection pipeline.
//!
//! - **mangle**: file names for command output
//! - **paths**: wildcard and glob expansion of catalog paths
//! - **tags**: host tag loading and flattening
//! - **hash**: SHA-256 helpers used when obfuscating hostnames

/// Command output file naming
pub mod mangle;

/// Wildcard and glob expansion
pub mod paths;

/// Host tag loading and flattening
pub mod tags;

/// Cryptographic hash helpers
pub mod hash;

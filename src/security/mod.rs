//! Safety checks applied before anything from the catalog runs.
//!
//! ## Example
//!
//! ```
//! use diag_collector::security::blacklist::is_blacklisted;
//!
//! assert!(is_blacklisted("sh -c 'kill -9 1'"));
//! assert!(!is_blacklisted("/usr/bin/lsblk -l"));
//! ```

/// Command blacklist enforcement for pre-commands
pub mod blacklist;

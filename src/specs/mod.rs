//! Data-source descriptor categorization.
//!
//! Produces the report of every command and path the catalog may touch,
//! grouped into static files, globs, file templates, static commands and
//! command templates.

pub mod categorize;

pub use categorize::{categorize, resolve, Category, DataSource};

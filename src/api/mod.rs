//! Catalog server API
//!
//! - Listing pages and file sets
//! - Live channel list
//! - Stream command resolution and probing

pub mod catalog;

pub use catalog::{CatalogClient, CatalogError};

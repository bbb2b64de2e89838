//! siteproxy-core: Core types for siteproxy
//!
//! This crate provides the fundamental types used throughout siteproxy:
//! - Configuration loading (YAML or TOML)
//! - The site registry and site descriptors
//! - Site status records and their partial views
//! - Error handling

pub mod config;
pub mod error;
pub mod registry;
pub mod site;

pub use config::*;
pub use error::*;
pub use registry::SiteRegistry;
pub use site::*;

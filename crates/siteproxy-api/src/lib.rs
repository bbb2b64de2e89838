//! siteproxy-api: REST API server for siteproxy
//!
//! This crate exposes the site monitor over HTTP:
//! - Full status listing
//! - Best-site selection
//! - Per-site health, queue and connection views

pub mod rest;

pub use rest::create_router;

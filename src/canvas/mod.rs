//! Canvas REST API access.
//!
//! This module provides the HTTP transport and pagination helpers used by the aggregator.

pub mod client;
pub mod pagination;

pub use client::{ApiResponse, HttpTransport, Transport};

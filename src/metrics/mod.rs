//! Prometheus metrics for the XtraDB Backup Operator
//!
//! This module exposes metrics for monitoring operator health and reconciliation.

mod prometheus;

pub use prometheus::*;

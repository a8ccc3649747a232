//! Segment membership service library crate.
//!
//! # Purpose
//! Exposes the segment catalog, membership store backends, expiry sweeper,
//! and HTTP surface for use by the binary and the integration tests.
//!
//! # Notes
//! Module boundaries mirror the HTTP API, the storage backends, and the
//! background sweeper.
pub mod api;
pub mod app;
pub mod catalog;
pub mod config;
pub mod model;
pub mod observability;
pub mod sample;
pub mod store;
pub mod sweeper;

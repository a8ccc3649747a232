//! HTTP API surface: request/response types, error mapping, and handlers.
pub mod error;
pub mod memberships;
pub mod openapi;
pub mod segments;
pub mod system;
pub mod types;

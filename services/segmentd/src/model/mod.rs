//! Domain model module.
//!
//! # Purpose
//! Re-exports the segment and membership types shared by the catalog, the
//! store backends, the API, and the sweeper.
mod membership;
mod segment;

pub use membership::{Expiry, Membership, MembershipKey};
pub use segment::Segment;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A named segment in the catalog.
///
/// `percent` records the enrollment percentage the segment was created with;
/// it only drives the initial random sample and is kept for inspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Segment {
    pub id: i64,
    pub name: String,
    pub percent: i32,
}

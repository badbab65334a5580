//! Location domain model.
//!
//! Locations form a per-tenant tree through `parent_id` and contain
//! assets up to an optional capacity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub parent_id: Option<Uuid>,
    /// `None` means unbounded.
    pub max_capacity: Option<u64>,
    /// Derived: assets whose `location_id` points here.
    pub current_count: u64,
    /// Bumped by every capacity-guarded asset write into this location,
    /// so concurrent transfers into it conflict at commit.
    pub occupancy_epoch: u64,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Location {
    pub fn is_full(&self, occupancy: u64) -> bool {
        self.max_capacity.is_some_and(|max| occupancy >= max)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLocation {
    pub name: String,
    pub parent_id: Option<Uuid>,
    pub max_capacity: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateLocation {
    pub name: Option<String>,
    /// `Some(None)` detaches the location into a root.
    pub parent_id: Option<Option<Uuid>>,
    /// `Some(None)` removes the capacity limit.
    pub max_capacity: Option<Option<u64>>,
}

crate::impl_tenant_scoped!(Location);

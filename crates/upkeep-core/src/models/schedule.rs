//! Maintenance schedule domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A recurring maintenance or inspection plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub asset_id: Option<Uuid>,
    /// Checklist to run when the schedule comes due.
    pub checklist_id: Option<Uuid>,
    /// Recurrence interval, always positive.
    pub interval_days: u32,
    pub next_due_at: DateTime<Utc>,
    pub active: bool,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSchedule {
    pub name: String,
    pub asset_id: Option<Uuid>,
    pub checklist_id: Option<Uuid>,
    pub interval_days: u32,
    pub next_due_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateSchedule {
    pub name: Option<String>,
    pub asset_id: Option<Option<Uuid>>,
    pub checklist_id: Option<Option<Uuid>>,
    pub interval_days: Option<u32>,
    pub next_due_at: Option<DateTime<Utc>>,
    pub active: Option<bool>,
}

crate::impl_tenant_scoped!(Schedule);

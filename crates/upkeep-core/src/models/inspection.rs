//! Inspection domain model.
//!
//! An inspection runs a checklist, optionally against one asset, and
//! ends with a report document. The report is frozen once the
//! inspection is completed.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::UpkeepError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum InspectionStatus {
    Pending,
    Completed,
}

impl InspectionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            InspectionStatus::Pending => "Pending",
            InspectionStatus::Completed => "Completed",
        }
    }
}

impl fmt::Display for InspectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InspectionStatus {
    type Err = UpkeepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(InspectionStatus::Pending),
            "Completed" => Ok(InspectionStatus::Completed),
            other => Err(UpkeepError::validation(format!(
                "unknown inspection status: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Inspection {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub checklist_id: Uuid,
    pub asset_id: Option<Uuid>,
    pub inspector_id: Uuid,
    pub status: InspectionStatus,
    pub report: Option<serde_json::Value>,
    pub completed_at: Option<DateTime<Utc>>,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateInspection {
    pub checklist_id: Uuid,
    pub asset_id: Option<Uuid>,
    pub inspector_id: Uuid,
    pub status: InspectionStatus,
    pub report: Option<serde_json::Value>,
    /// Set by the service when created already `Completed`.
    #[serde(skip)]
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateInspection {
    pub asset_id: Option<Option<Uuid>>,
    pub status: Option<InspectionStatus>,
    pub report: Option<serde_json::Value>,
    /// Set by the service when the status moves to `Completed`.
    #[serde(skip)]
    pub completed_at: Option<DateTime<Utc>>,
}

crate::impl_tenant_scoped!(Inspection);

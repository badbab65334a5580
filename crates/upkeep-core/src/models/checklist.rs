//! Checklist domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checklist {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub description: String,
    /// Schema-flexible template; see [`crate::document`].
    pub template: Option<serde_json::Value>,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateChecklist {
    pub name: String,
    pub description: String,
    pub template: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateChecklist {
    pub name: Option<String>,
    pub description: Option<String>,
    /// `Some(None)` clears the template.
    pub template: Option<Option<serde_json::Value>>,
}

crate::impl_tenant_scoped!(Checklist);

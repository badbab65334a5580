//! Supplier domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Supplier {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    /// Short vendor code, unique within the tenant.
    pub code: String,
    pub contact_email: Option<String>,
    pub metadata: serde_json::Value,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSupplier {
    pub name: String,
    pub code: String,
    pub contact_email: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateSupplier {
    pub name: Option<String>,
    pub code: Option<String>,
    pub contact_email: Option<Option<String>>,
    pub metadata: Option<serde_json::Value>,
}

crate::impl_tenant_scoped!(Supplier);

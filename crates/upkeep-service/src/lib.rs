//! upkeep service layer: the versioned resource manager and the checks
//! that run around every write.
//!
//! - [`manager::VersionedResourceManager`] authorizes, applies lifecycle
//!   rules and performs compare-and-swap updates for one record family.
//! - [`integrity::IntegrityChecker`] refuses to delete containers that
//!   still have live dependents.
//! - [`counts::CountTracker`] recomputes derived counters from source
//!   rows.
//! - [`lifecycle`] holds the per-family rules: reference checks,
//!   capacity checks, hierarchy acyclicity and document guarding.

pub mod counts;
pub mod integrity;
pub mod lifecycle;
pub mod manager;

pub use counts::CountTracker;
pub use integrity::IntegrityChecker;
pub use lifecycle::{
    AssetLifecycle, ChecklistLifecycle, DepartmentLifecycle, InspectionLifecycle, Lifecycle,
    LocationLifecycle, ScheduleLifecycle, SupplierLifecycle, UserLifecycle,
};
pub use manager::VersionedResourceManager;

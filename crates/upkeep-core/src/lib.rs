//! upkeep core: shared models, tenant context, the access guard, the
//! document validator and the repository contracts.
//!
//! Nothing in this crate performs I/O.

pub mod context;
pub mod document;
pub mod error;
pub mod guard;
pub mod models;
pub mod repository;

pub use context::{Principal, Role};
pub use error::{ConflictReason, UpkeepError, UpkeepResult};
pub use guard::{AccessRoles, authorize, authorize_tenant};

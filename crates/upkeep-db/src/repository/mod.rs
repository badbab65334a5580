//! SurrealDB repository implementations.

mod asset;
mod checklist;
mod department;
mod inspection;
mod location;
mod organization;
mod schedule;
mod supplier;
mod user;
pub(crate) mod versioned;

pub use asset::SurrealAssetRepository;
pub use checklist::SurrealChecklistRepository;
pub use department::SurrealDepartmentRepository;
pub use inspection::SurrealInspectionRepository;
pub use location::SurrealLocationRepository;
pub use organization::SurrealOrganizationRepository;
pub use schedule::SurrealScheduleRepository;
pub use supplier::SurrealSupplierRepository;
pub use user::SurrealUserRepository;

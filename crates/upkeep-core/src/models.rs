//! Domain models for upkeep.
//!
//! Every record except [`organization::Organization`] is tenant-scoped
//! and implements [`resource::TenantScoped`].

pub mod asset;
pub mod checklist;
pub mod department;
pub mod inspection;
pub mod location;
pub mod organization;
pub mod resource;
pub mod schedule;
pub mod supplier;
pub mod user;

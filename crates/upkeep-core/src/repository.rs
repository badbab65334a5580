//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Every tenant-scoped operation
//! takes the tenant explicitly; the only tenant-less lookup is
//! [`VersionedRepository::locate`], which exists so the access guard can
//! tell "not yours" from "not there".

use uuid::Uuid;

use crate::error::UpkeepResult;
use crate::models::{
    location::{CreateLocation, Location, UpdateLocation},
    organization::{CreateOrganization, Organization},
    resource::{Container, Dependent, ResourceKind, ResourceStamp, TenantScoped},
    user::{CreateUser, UpdateUser, User},
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

// ---------------------------------------------------------------------------
// Organizations (global scope)
// ---------------------------------------------------------------------------

pub trait OrganizationRepository: Send + Sync {
    fn create(
        &self,
        input: CreateOrganization,
    ) -> impl Future<Output = UpkeepResult<Organization>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = UpkeepResult<Organization>> + Send;
    fn get_by_slug(&self, slug: &str) -> impl Future<Output = UpkeepResult<Organization>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = UpkeepResult<PaginatedResult<Organization>>> + Send;
}

// ---------------------------------------------------------------------------
// Tenant-scoped, version-stamped records
// ---------------------------------------------------------------------------

/// CRUD over one tenant-scoped record family with compare-and-swap
/// updates.
pub trait VersionedRepository: Send + Sync {
    type Resource: TenantScoped + Send + Sync;
    type Create: Send;
    type Update: Send;

    const KIND: ResourceKind;

    /// Tenant, id and version of a record, regardless of tenant.
    fn locate(&self, id: Uuid) -> impl Future<Output = UpkeepResult<ResourceStamp>> + Send;

    /// Insert at version 0 inside `tenant_id`.
    fn create(
        &self,
        tenant_id: Uuid,
        input: Self::Create,
    ) -> impl Future<Output = UpkeepResult<Self::Resource>> + Send;

    fn get_by_id(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = UpkeepResult<Self::Resource>> + Send;

    /// Apply `input` only if the stored version equals
    /// `expected_version`, bumping it by one in the same atomic write.
    ///
    /// Fails with `Conflict` on a version mismatch and `NotFound` if no
    /// row exists in the tenant. A failed call changes nothing.
    fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        expected_version: u64,
        input: Self::Update,
    ) -> impl Future<Output = UpkeepResult<Self::Resource>> + Send;

    fn delete(&self, tenant_id: Uuid, id: Uuid) -> impl Future<Output = UpkeepResult<()>> + Send;

    fn list(
        &self,
        tenant_id: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = UpkeepResult<PaginatedResult<Self::Resource>>> + Send;
}

pub trait UserRepository:
    VersionedRepository<Resource = User, Create = CreateUser, Update = UpdateUser>
{
    fn get_by_username(
        &self,
        tenant_id: Uuid,
        username: &str,
    ) -> impl Future<Output = UpkeepResult<User>> + Send;
    fn get_by_email(
        &self,
        tenant_id: Uuid,
        email: &str,
    ) -> impl Future<Output = UpkeepResult<User>> + Send;
}

pub trait LocationRepository:
    VersionedRepository<Resource = Location, Create = CreateLocation, Update = UpdateLocation>
{
    /// Direct children of a location.
    fn get_children(
        &self,
        tenant_id: Uuid,
        parent_id: Uuid,
    ) -> impl Future<Output = UpkeepResult<Vec<Location>>> + Send;

    /// All ancestors of a location, nearest first, excluding itself.
    ///
    /// Fails with `Validation` rather than returning a partial list when
    /// the chain is deeper than the walk's bound.
    fn get_ancestors(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = UpkeepResult<Vec<Location>>> + Send;
}

// ---------------------------------------------------------------------------
// Relationships
// ---------------------------------------------------------------------------

/// Authoritative answers about pointers between records, always computed
/// from source rows and never from derived counters.
pub trait RelationStore: Send + Sync {
    /// Whether a live row of `kind` with `id` exists in the tenant.
    fn exists(
        &self,
        tenant_id: Uuid,
        kind: ResourceKind,
        id: Uuid,
    ) -> impl Future<Output = UpkeepResult<bool>> + Send;

    /// Live rows of `dependent` pointing at `container`.
    fn count_dependents(
        &self,
        tenant_id: Uuid,
        container: Container,
        dependent: Dependent,
    ) -> impl Future<Output = UpkeepResult<u64>> + Send;

    /// Recount the container's counted dependents and overwrite its
    /// derived counter with the result. Does not touch `version`.
    fn refresh_counter(
        &self,
        tenant_id: Uuid,
        container: Container,
    ) -> impl Future<Output = UpkeepResult<u64>> + Send;

    /// Delete the container only if, within the same statement, none of
    /// its blocking dependents exist. Returns `false` if the row was kept.
    fn delete_unreferenced(
        &self,
        tenant_id: Uuid,
        container: Container,
    ) -> impl Future<Output = UpkeepResult<bool>> + Send;
}

//! Per-family write rules plugged into the resource manager.
//!
//! A lifecycle validates and normalises an input before it reaches the
//! store, and names the containers whose derived counters the write may
//! affect. It never performs the write itself.

use chrono::Utc;
use tracing::{debug, info};
use upkeep_core::document;
use upkeep_core::error::{ConflictReason, UpkeepError, UpkeepResult};
use upkeep_core::guard::AccessRoles;
use upkeep_core::models::asset::{Asset, CreateAsset, UpdateAsset};
use upkeep_core::models::checklist::{Checklist, CreateChecklist, UpdateChecklist};
use upkeep_core::models::department::{CreateDepartment, Department, UpdateDepartment};
use upkeep_core::models::inspection::{
    CreateInspection, Inspection, InspectionStatus, UpdateInspection,
};
use upkeep_core::models::location::{CreateLocation, Location, UpdateLocation};
use upkeep_core::models::resource::{Container, Dependent, ResourceKind};
use upkeep_core::models::schedule::{CreateSchedule, Schedule, UpdateSchedule};
use upkeep_core::models::supplier::{CreateSupplier, Supplier, UpdateSupplier};
use upkeep_core::models::user::{CreateUser, UpdateUser, User};
use upkeep_core::repository::{LocationRepository, RelationStore, VersionedRepository};
use uuid::Uuid;

/// Write rules for one record family.
///
/// Every hook defaults to "nothing to do".
pub trait Lifecycle<R: VersionedRepository>: Send + Sync {
    /// Roles admitted by each operation on this family.
    const ROLES: AccessRoles;

    fn prepare_create(
        &self,
        _tenant_id: Uuid,
        _input: &mut R::Create,
    ) -> impl Future<Output = UpkeepResult<()>> + Send {
        async { Ok(()) }
    }

    /// Runs after the caller's expected version was checked against
    /// `current`, before the compare-and-swap write.
    fn prepare_update(
        &self,
        _tenant_id: Uuid,
        _current: &R::Resource,
        _input: &mut R::Update,
    ) -> impl Future<Output = UpkeepResult<()>> + Send {
        async { Ok(()) }
    }

    fn counted_in_create(&self, _input: &R::Create) -> Vec<Container> {
        Vec::new()
    }

    fn counted_in_update(&self, _current: &R::Resource, _input: &R::Update) -> Vec<Container> {
        Vec::new()
    }

    fn counted_in_delete(&self, _current: &R::Resource) -> Vec<Container> {
        Vec::new()
    }
}

/// Fail with `NotFound` unless `id` is `None` or names a live row of
/// `kind` in the tenant.
async fn require<S: RelationStore>(
    relations: &S,
    tenant_id: Uuid,
    kind: ResourceKind,
    id: Option<Uuid>,
) -> UpkeepResult<()> {
    let Some(id) = id else {
        return Ok(());
    };
    if relations.exists(tenant_id, kind, id).await? {
        Ok(())
    } else {
        debug!(%tenant_id, %kind, %id, "Dangling reference rejected");
        Err(UpkeepError::not_found(kind.table(), id))
    }
}

fn locations(ids: impl IntoIterator<Item = Option<Uuid>>) -> Vec<Container> {
    ids.into_iter().flatten().map(Container::Location).collect()
}

fn departments(ids: impl IntoIterator<Item = Option<Uuid>>) -> Vec<Container> {
    ids.into_iter().flatten().map(Container::Department).collect()
}

// ---------------------------------------------------------------------------
// Assets
// ---------------------------------------------------------------------------

/// Reference checks plus a capacity check on the target location.
pub struct AssetLifecycle<L, S> {
    locations: L,
    relations: S,
}

impl<L: LocationRepository, S: RelationStore> AssetLifecycle<L, S> {
    pub fn new(locations: L, relations: S) -> Self {
        Self {
            locations,
            relations,
        }
    }

    /// Refuse early when `location_id` is already full.
    ///
    /// The asset store repeats this check in the same transaction as
    /// the write, so a transfer that passes here can still be refused.
    async fn check_capacity(&self, tenant_id: Uuid, location_id: Uuid) -> UpkeepResult<()> {
        let location = self.locations.get_by_id(tenant_id, location_id).await?;
        let Some(max) = location.max_capacity else {
            return Ok(());
        };

        let occupancy = self
            .relations
            .count_dependents(tenant_id, Container::Location(location_id), Dependent::Asset)
            .await?;

        if location.is_full(occupancy) {
            info!(%tenant_id, %location_id, occupancy, max, "Location is at capacity");
            return Err(ConflictReason::Capacity {
                location: location_id,
                current: occupancy,
                max,
            }
            .into());
        }
        Ok(())
    }
}

impl<R, L, S> Lifecycle<R> for AssetLifecycle<L, S>
where
    R: VersionedRepository<Resource = Asset, Create = CreateAsset, Update = UpdateAsset>,
    L: LocationRepository,
    S: RelationStore,
{
    const ROLES: AccessRoles = AccessRoles::MANAGED;

    async fn prepare_create(&self, tenant_id: Uuid, input: &mut CreateAsset) -> UpkeepResult<()> {
        require(&self.relations, tenant_id, ResourceKind::User, input.assigned_to).await?;
        require(&self.relations, tenant_id, ResourceKind::Supplier, input.supplier_id).await?;
        if let Some(location_id) = input.location_id {
            self.check_capacity(tenant_id, location_id).await?;
        }
        Ok(())
    }

    async fn prepare_update(
        &self,
        tenant_id: Uuid,
        current: &Asset,
        input: &mut UpdateAsset,
    ) -> UpkeepResult<()> {
        require(
            &self.relations,
            tenant_id,
            ResourceKind::User,
            input.assigned_to.flatten(),
        )
        .await?;
        require(
            &self.relations,
            tenant_id,
            ResourceKind::Supplier,
            input.supplier_id.flatten(),
        )
        .await?;
        match input.location_id {
            Some(Some(target)) if current.location_id != Some(target) => {
                self.check_capacity(tenant_id, target).await
            }
            _ => Ok(()),
        }
    }

    fn counted_in_create(&self, input: &CreateAsset) -> Vec<Container> {
        locations([input.location_id])
    }

    fn counted_in_update(&self, current: &Asset, input: &UpdateAsset) -> Vec<Container> {
        match input.location_id {
            Some(target) => locations([current.location_id, target]),
            None => Vec::new(),
        }
    }

    fn counted_in_delete(&self, current: &Asset) -> Vec<Container> {
        locations([current.location_id])
    }
}

// ---------------------------------------------------------------------------
// Locations
// ---------------------------------------------------------------------------

/// Keeps the location tree acyclic.
pub struct LocationLifecycle<L> {
    locations: L,
}

impl<L: LocationRepository> LocationLifecycle<L> {
    pub fn new(locations: L) -> Self {
        Self { locations }
    }

    /// Fail unless `parent_id` exists in the tenant and `id` is neither
    /// the parent nor one of its ancestors.
    async fn check_parent(&self, tenant_id: Uuid, id: Option<Uuid>, parent_id: Uuid) -> UpkeepResult<()> {
        let parent = self.locations.get_by_id(tenant_id, parent_id).await?;
        let Some(id) = id else {
            return Ok(());
        };

        if parent.id == id {
            return Err(UpkeepError::validation("a location cannot be its own parent"));
        }
        let ancestors = self.locations.get_ancestors(tenant_id, parent.id).await?;
        if ancestors.iter().any(|a| a.id == id) {
            debug!(%tenant_id, %id, %parent_id, "Cyclic re-parent rejected");
            return Err(UpkeepError::validation(format!(
                "location {parent_id} is a descendant of {id}"
            )));
        }
        Ok(())
    }
}

impl<R, L> Lifecycle<R> for LocationLifecycle<L>
where
    R: VersionedRepository<Resource = Location, Create = CreateLocation, Update = UpdateLocation>,
    L: LocationRepository,
{
    const ROLES: AccessRoles = AccessRoles::MANAGED;

    async fn prepare_create(&self, tenant_id: Uuid, input: &mut CreateLocation) -> UpkeepResult<()> {
        match input.parent_id {
            Some(parent_id) => self.check_parent(tenant_id, None, parent_id).await,
            None => Ok(()),
        }
    }

    async fn prepare_update(
        &self,
        tenant_id: Uuid,
        current: &Location,
        input: &mut UpdateLocation,
    ) -> UpkeepResult<()> {
        match input.parent_id {
            Some(Some(parent_id)) if current.parent_id != Some(parent_id) => {
                self.check_parent(tenant_id, Some(current.id), parent_id).await
            }
            _ => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Departments and users
// ---------------------------------------------------------------------------

pub struct DepartmentLifecycle<S> {
    relations: S,
}

impl<S: RelationStore> DepartmentLifecycle<S> {
    pub fn new(relations: S) -> Self {
        Self { relations }
    }
}

impl<R, S> Lifecycle<R> for DepartmentLifecycle<S>
where
    R: VersionedRepository<
            Resource = Department,
            Create = CreateDepartment,
            Update = UpdateDepartment,
        >,
    S: RelationStore,
{
    const ROLES: AccessRoles = AccessRoles::ADMINISTERED;

    async fn prepare_create(&self, tenant_id: Uuid, input: &mut CreateDepartment) -> UpkeepResult<()> {
        require(&self.relations, tenant_id, ResourceKind::User, input.manager_id).await
    }

    async fn prepare_update(
        &self,
        tenant_id: Uuid,
        _current: &Department,
        input: &mut UpdateDepartment,
    ) -> UpkeepResult<()> {
        require(
            &self.relations,
            tenant_id,
            ResourceKind::User,
            input.manager_id.flatten(),
        )
        .await
    }
}

/// Users feed their department's employee count through both
/// `department_id` and `status`.
pub struct UserLifecycle<S> {
    relations: S,
}

impl<S: RelationStore> UserLifecycle<S> {
    pub fn new(relations: S) -> Self {
        Self { relations }
    }
}

impl<R, S> Lifecycle<R> for UserLifecycle<S>
where
    R: VersionedRepository<Resource = User, Create = CreateUser, Update = UpdateUser>,
    S: RelationStore,
{
    const ROLES: AccessRoles = AccessRoles::ADMINISTERED;

    async fn prepare_create(&self, tenant_id: Uuid, input: &mut CreateUser) -> UpkeepResult<()> {
        require(
            &self.relations,
            tenant_id,
            ResourceKind::Department,
            input.department_id,
        )
        .await
    }

    async fn prepare_update(
        &self,
        tenant_id: Uuid,
        _current: &User,
        input: &mut UpdateUser,
    ) -> UpkeepResult<()> {
        require(
            &self.relations,
            tenant_id,
            ResourceKind::Department,
            input.department_id.flatten(),
        )
        .await
    }

    fn counted_in_create(&self, input: &CreateUser) -> Vec<Container> {
        departments([input.department_id])
    }

    fn counted_in_update(&self, current: &User, input: &UpdateUser) -> Vec<Container> {
        if input.department_id.is_none() && input.status.is_none() {
            return Vec::new();
        }
        departments([current.department_id, input.department_id.flatten()])
    }

    fn counted_in_delete(&self, current: &User) -> Vec<Container> {
        departments([current.department_id])
    }
}

// ---------------------------------------------------------------------------
// Suppliers and schedules
// ---------------------------------------------------------------------------

pub struct SupplierLifecycle;

impl<R> Lifecycle<R> for SupplierLifecycle
where
    R: VersionedRepository<Resource = Supplier, Create = CreateSupplier, Update = UpdateSupplier>,
{
    const ROLES: AccessRoles = AccessRoles::MANAGED;
}

pub struct ScheduleLifecycle<S> {
    relations: S,
}

impl<S: RelationStore> ScheduleLifecycle<S> {
    pub fn new(relations: S) -> Self {
        Self { relations }
    }
}

fn check_interval(interval_days: u32) -> UpkeepResult<()> {
    if interval_days == 0 {
        return Err(UpkeepError::validation(
            "schedule interval must be at least one day",
        ));
    }
    Ok(())
}

impl<R, S> Lifecycle<R> for ScheduleLifecycle<S>
where
    R: VersionedRepository<Resource = Schedule, Create = CreateSchedule, Update = UpdateSchedule>,
    S: RelationStore,
{
    const ROLES: AccessRoles = AccessRoles::MANAGED;

    async fn prepare_create(&self, tenant_id: Uuid, input: &mut CreateSchedule) -> UpkeepResult<()> {
        check_interval(input.interval_days)?;
        require(&self.relations, tenant_id, ResourceKind::Asset, input.asset_id).await?;
        require(
            &self.relations,
            tenant_id,
            ResourceKind::Checklist,
            input.checklist_id,
        )
        .await
    }

    async fn prepare_update(
        &self,
        tenant_id: Uuid,
        _current: &Schedule,
        input: &mut UpdateSchedule,
    ) -> UpkeepResult<()> {
        if let Some(interval_days) = input.interval_days {
            check_interval(interval_days)?;
        }
        require(
            &self.relations,
            tenant_id,
            ResourceKind::Asset,
            input.asset_id.flatten(),
        )
        .await?;
        require(
            &self.relations,
            tenant_id,
            ResourceKind::Checklist,
            input.checklist_id.flatten(),
        )
        .await
    }
}

// ---------------------------------------------------------------------------
// Document-bearing records
// ---------------------------------------------------------------------------

/// Validates the template and stores a private copy of it.
pub struct ChecklistLifecycle;

impl<R> Lifecycle<R> for ChecklistLifecycle
where
    R: VersionedRepository<
            Resource = Checklist,
            Create = CreateChecklist,
            Update = UpdateChecklist,
        >,
{
    const ROLES: AccessRoles = AccessRoles::MANAGED;

    async fn prepare_create(&self, _tenant_id: Uuid, input: &mut CreateChecklist) -> UpkeepResult<()> {
        input.template = document::deep_copy(input.template.as_ref())?;
        Ok(())
    }

    async fn prepare_update(
        &self,
        _tenant_id: Uuid,
        _current: &Checklist,
        input: &mut UpdateChecklist,
    ) -> UpkeepResult<()> {
        if let Some(template) = input.template.take() {
            input.template = Some(document::deep_copy(template.as_ref())?);
        }
        Ok(())
    }
}

/// Report guarding for inspections.
///
/// A report may change while the inspection is pending. Once completed,
/// the report is frozen and the inspection cannot be reopened.
pub struct InspectionLifecycle<S> {
    relations: S,
}

impl<S: RelationStore> InspectionLifecycle<S> {
    pub fn new(relations: S) -> Self {
        Self { relations }
    }
}

impl<R, S> Lifecycle<R> for InspectionLifecycle<S>
where
    R: VersionedRepository<
            Resource = Inspection,
            Create = CreateInspection,
            Update = UpdateInspection,
        >,
    S: RelationStore,
{
    const ROLES: AccessRoles = AccessRoles::FIELD_WORK;

    async fn prepare_create(&self, tenant_id: Uuid, input: &mut CreateInspection) -> UpkeepResult<()> {
        input.report = document::deep_copy(input.report.as_ref())?;
        require(
            &self.relations,
            tenant_id,
            ResourceKind::Checklist,
            Some(input.checklist_id),
        )
        .await?;
        require(
            &self.relations,
            tenant_id,
            ResourceKind::User,
            Some(input.inspector_id),
        )
        .await?;
        require(&self.relations, tenant_id, ResourceKind::Asset, input.asset_id).await?;

        input.completed_at = match input.status {
            InspectionStatus::Completed => Some(Utc::now()),
            InspectionStatus::Pending => None,
        };
        Ok(())
    }

    async fn prepare_update(
        &self,
        tenant_id: Uuid,
        current: &Inspection,
        input: &mut UpdateInspection,
    ) -> UpkeepResult<()> {
        if current.status == InspectionStatus::Completed
            && (input.report.is_some() || input.status == Some(InspectionStatus::Pending))
        {
            info!(%tenant_id, inspection_id = %current.id, "Write to finalized inspection refused");
            return Err(ConflictReason::Finalized {
                entity: ResourceKind::Inspection.to_string(),
                id: current.id,
            }
            .into());
        }

        if let Some(report) = input.report.take() {
            input.report = document::deep_copy(Some(&report))?;
        }
        require(
            &self.relations,
            tenant_id,
            ResourceKind::Asset,
            input.asset_id.flatten(),
        )
        .await?;

        input.completed_at = match (current.status, input.status) {
            (InspectionStatus::Pending, Some(InspectionStatus::Completed)) => Some(Utc::now()),
            _ => None,
        };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_interval_is_invalid() {
        assert!(matches!(
            check_interval(0),
            Err(UpkeepError::Validation { .. })
        ));
        check_interval(1).unwrap();
    }

    #[test]
    fn absent_pointers_name_no_container() {
        let id = Uuid::new_v4();
        assert_eq!(
            locations([None, Some(id), None]),
            vec![Container::Location(id)]
        );
        assert!(departments([None]).is_empty());
    }
}

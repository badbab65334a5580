//! Shared fixture: an in-memory database and one manager per record
//! family, all bound to the same store.

#![allow(dead_code)]

use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use upkeep_core::context::{Principal, Role};
use upkeep_core::models::asset::{AssetStatus, CreateAsset};
use upkeep_core::models::location::CreateLocation;
use upkeep_core::models::user::CreateUser;
use upkeep_db::SurrealRelationStore;
use upkeep_db::repository::{
    SurrealAssetRepository, SurrealChecklistRepository, SurrealDepartmentRepository,
    SurrealInspectionRepository, SurrealLocationRepository, SurrealScheduleRepository,
    SurrealSupplierRepository, SurrealUserRepository,
};
use upkeep_service::{
    AssetLifecycle, ChecklistLifecycle, DepartmentLifecycle, InspectionLifecycle,
    LocationLifecycle, ScheduleLifecycle, SupplierLifecycle, UserLifecycle,
    VersionedResourceManager,
};
use uuid::Uuid;

pub type Relations = SurrealRelationStore<Db>;
pub type Locations = SurrealLocationRepository<Db>;

pub type AssetManager =
    VersionedResourceManager<SurrealAssetRepository<Db>, AssetLifecycle<Locations, Relations>, Relations>;
pub type LocationManager =
    VersionedResourceManager<Locations, LocationLifecycle<Locations>, Relations>;
pub type DepartmentManager = VersionedResourceManager<
    SurrealDepartmentRepository<Db>,
    DepartmentLifecycle<Relations>,
    Relations,
>;
pub type UserManager =
    VersionedResourceManager<SurrealUserRepository<Db>, UserLifecycle<Relations>, Relations>;
pub type SupplierManager =
    VersionedResourceManager<SurrealSupplierRepository<Db>, SupplierLifecycle, Relations>;
pub type ScheduleManager =
    VersionedResourceManager<SurrealScheduleRepository<Db>, ScheduleLifecycle<Relations>, Relations>;
pub type ChecklistManager =
    VersionedResourceManager<SurrealChecklistRepository<Db>, ChecklistLifecycle, Relations>;
pub type InspectionManager = VersionedResourceManager<
    SurrealInspectionRepository<Db>,
    InspectionLifecycle<Relations>,
    Relations,
>;

pub struct Harness {
    pub db: Surreal<Db>,
    pub tenant: Uuid,
}

impl Harness {
    pub async fn new() -> Self {
        let db = Surreal::new::<Mem>(()).await.unwrap();
        db.use_ns("test").use_db("test").await.unwrap();
        upkeep_db::run_migrations(&db).await.unwrap();
        Self {
            db,
            tenant: Uuid::new_v4(),
        }
    }

    pub fn principal(&self, role: Role) -> Principal {
        Principal::new(Uuid::new_v4(), self.tenant, role)
    }

    pub fn admin(&self) -> Principal {
        self.principal(Role::Admin)
    }

    /// A principal of another tenant.
    pub fn outsider(&self, role: Role) -> Principal {
        Principal::new(Uuid::new_v4(), Uuid::new_v4(), role)
    }

    fn relations(&self) -> Relations {
        SurrealRelationStore::new(self.db.clone())
    }

    fn location_repo(&self) -> Locations {
        SurrealLocationRepository::new(self.db.clone())
    }

    pub fn assets(&self) -> AssetManager {
        VersionedResourceManager::new(
            SurrealAssetRepository::new(self.db.clone()),
            AssetLifecycle::new(self.location_repo(), self.relations()),
            self.relations(),
        )
    }

    pub fn locations(&self) -> LocationManager {
        VersionedResourceManager::new(
            self.location_repo(),
            LocationLifecycle::new(self.location_repo()),
            self.relations(),
        )
    }

    pub fn departments(&self) -> DepartmentManager {
        VersionedResourceManager::new(
            SurrealDepartmentRepository::new(self.db.clone()),
            DepartmentLifecycle::new(self.relations()),
            self.relations(),
        )
    }

    pub fn users(&self) -> UserManager {
        VersionedResourceManager::new(
            SurrealUserRepository::new(self.db.clone()),
            UserLifecycle::new(self.relations()),
            self.relations(),
        )
    }

    pub fn suppliers(&self) -> SupplierManager {
        VersionedResourceManager::new(
            SurrealSupplierRepository::new(self.db.clone()),
            SupplierLifecycle,
            self.relations(),
        )
    }

    pub fn schedules(&self) -> ScheduleManager {
        VersionedResourceManager::new(
            SurrealScheduleRepository::new(self.db.clone()),
            ScheduleLifecycle::new(self.relations()),
            self.relations(),
        )
    }

    pub fn checklists(&self) -> ChecklistManager {
        VersionedResourceManager::new(
            SurrealChecklistRepository::new(self.db.clone()),
            ChecklistLifecycle,
            self.relations(),
        )
    }

    pub fn inspections(&self) -> InspectionManager {
        VersionedResourceManager::new(
            SurrealInspectionRepository::new(self.db.clone()),
            InspectionLifecycle::new(self.relations()),
            self.relations(),
        )
    }
}

pub fn asset(tag: &str, location_id: Option<Uuid>) -> CreateAsset {
    CreateAsset {
        name: format!("Asset {tag}"),
        asset_tag: tag.into(),
        status: AssetStatus::Available,
        assigned_to: None,
        location_id,
        supplier_id: None,
        metadata: None,
    }
}

pub fn location(name: &str, parent_id: Option<Uuid>, max_capacity: Option<u64>) -> CreateLocation {
    CreateLocation {
        name: name.into(),
        parent_id,
        max_capacity,
    }
}

pub fn user(name: &str, role: Role, department_id: Option<Uuid>) -> CreateUser {
    CreateUser {
        username: name.into(),
        email: format!("{name}@example.com"),
        password: "correct-horse-battery".into(),
        role,
        department_id,
        metadata: None,
    }
}

//! The shape shared by every tenant-scoped, version-stamped record, and
//! the relationships between record kinds.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A record confined to one tenant and guarded by an optimistic version.
///
/// `tenant_id` never changes after creation. `version` starts at 0 and
/// grows by exactly one per successful update.
pub trait TenantScoped {
    fn id(&self) -> Uuid;
    fn tenant_id(&self) -> Uuid;
    fn version(&self) -> u64;
}

/// Identity, tenant and version of a record without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceStamp {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub version: u64,
}

impl TenantScoped for ResourceStamp {
    fn id(&self) -> Uuid {
        self.id
    }

    fn tenant_id(&self) -> Uuid {
        self.tenant_id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Implements [`TenantScoped`] for models carrying the standard
/// `id`/`tenant_id`/`version` fields.
#[macro_export]
macro_rules! impl_tenant_scoped {
    ($($model:ty),+ $(,)?) => {
        $(
            impl $crate::models::resource::TenantScoped for $model {
                fn id(&self) -> ::uuid::Uuid {
                    self.id
                }

                fn tenant_id(&self) -> ::uuid::Uuid {
                    self.tenant_id
                }

                fn version(&self) -> u64 {
                    self.version
                }
            }
        )+
    };
}

/// Every tenant-scoped record family. The string form is the table name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    User,
    Department,
    Location,
    Asset,
    Supplier,
    Schedule,
    Checklist,
    Inspection,
}

impl ResourceKind {
    pub fn table(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Department => "department",
            Self::Location => "location",
            Self::Asset => "asset",
            Self::Supplier => "supplier",
            Self::Schedule => "schedule",
            Self::Checklist => "checklist",
            Self::Inspection => "inspection",
        }
    }

    /// The container view of a record of this kind, if other records can
    /// point at it and thereby block its deletion.
    pub fn container(self, id: Uuid) -> Option<Container> {
        match self {
            Self::Location => Some(Container::Location(id)),
            Self::Department => Some(Container::Department(id)),
            Self::Supplier => Some(Container::Supplier(id)),
            Self::Checklist => Some(Container::Checklist(id)),
            Self::User | Self::Asset | Self::Schedule | Self::Inspection => None,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

/// A record that other records reference through a pointer field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Container {
    Location(Uuid),
    Department(Uuid),
    Supplier(Uuid),
    Checklist(Uuid),
}

impl Container {
    pub fn id(self) -> Uuid {
        match self {
            Self::Location(id)
            | Self::Department(id)
            | Self::Supplier(id)
            | Self::Checklist(id) => id,
        }
    }

    pub fn kind(self) -> ResourceKind {
        match self {
            Self::Location(_) => ResourceKind::Location,
            Self::Department(_) => ResourceKind::Department,
            Self::Supplier(_) => ResourceKind::Supplier,
            Self::Checklist(_) => ResourceKind::Checklist,
        }
    }

    /// Dependent kinds whose live rows block deletion of this container.
    pub fn dependents(self) -> &'static [Dependent] {
        match self {
            Self::Location(_) => &[Dependent::Asset, Dependent::ChildLocation],
            Self::Department(_) => &[Dependent::Employee],
            Self::Supplier(_) => &[Dependent::Asset],
            Self::Checklist(_) => &[Dependent::Inspection, Dependent::Schedule],
        }
    }

    /// The dependent kind mirrored by this container's derived counter.
    pub fn counted(self) -> Option<Dependent> {
        match self {
            Self::Location(_) => Some(Dependent::Asset),
            Self::Department(_) => Some(Dependent::Employee),
            Self::Supplier(_) | Self::Checklist(_) => None,
        }
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.id())
    }
}

/// A kind of record that points at a [`Container`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dependent {
    Asset,
    ChildLocation,
    /// Users that are not soft-deleted.
    Employee,
    Inspection,
    Schedule,
}

impl Dependent {
    pub fn label(self) -> &'static str {
        match self {
            Self::Asset => "asset(s)",
            Self::ChildLocation => "child location(s)",
            Self::Employee => "employee(s)",
            Self::Inspection => "inspection(s)",
            Self::Schedule => "schedule(s)",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_referenced_kinds_are_containers() {
        let id = Uuid::new_v4();
        assert_eq!(
            ResourceKind::Department.container(id),
            Some(Container::Department(id))
        );
        assert_eq!(ResourceKind::Asset.container(id), None);
        assert_eq!(ResourceKind::User.container(id), None);
    }

    #[test]
    fn counted_dependent_is_one_of_the_blocking_ones() {
        let id = Uuid::new_v4();
        for container in [
            Container::Location(id),
            Container::Department(id),
            Container::Supplier(id),
            Container::Checklist(id),
        ] {
            if let Some(counted) = container.counted() {
                assert!(container.dependents().contains(&counted));
            }
        }
    }
}

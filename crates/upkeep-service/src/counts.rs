//! Aggregate count tracker.
//!
//! Derived counters (`current_count` on locations, `employee_count` on
//! departments) are never incremented or decremented. Whenever a
//! pointer that feeds one of them may have changed, the counter is
//! recounted from the dependent rows and overwritten.

use tracing::{debug, warn};
use upkeep_core::error::{UpkeepError, UpkeepResult};
use upkeep_core::models::resource::Container;
use upkeep_core::repository::RelationStore;
use uuid::Uuid;

pub struct CountTracker<'a, S: RelationStore> {
    relations: &'a S,
}

impl<'a, S: RelationStore> CountTracker<'a, S> {
    pub fn new(relations: &'a S) -> Self {
        Self { relations }
    }

    /// Recount one container and store the result.
    pub async fn recompute(&self, tenant_id: Uuid, container: Container) -> UpkeepResult<u64> {
        self.relations.refresh_counter(tenant_id, container).await
    }

    /// Recompute every counted container in `containers`, once each.
    ///
    /// Runs after a write whether or not the write succeeded, so
    /// failures here are logged and never replace the write's outcome.
    /// Containers without a derived counter and containers that no
    /// longer exist are skipped.
    pub async fn recompute_all(&self, tenant_id: Uuid, containers: &[Container]) {
        let mut seen = Vec::with_capacity(containers.len());
        for container in containers {
            if container.counted().is_none() || seen.contains(container) {
                continue;
            }
            seen.push(*container);

            match self.recompute(tenant_id, *container).await {
                Ok(count) => debug!(%tenant_id, container = %container, count, "Recomputed counter"),
                Err(UpkeepError::NotFound { .. }) => {}
                Err(e) => warn!(
                    %tenant_id,
                    container = %container,
                    error = %e,
                    "Counter recompute failed; it will be corrected by the next recompute"
                ),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use upkeep_core::models::resource::{Dependent, ResourceKind};

    use super::*;

    /// Records refreshes; a container listed in `missing` is reported
    /// as not found.
    #[derive(Default)]
    struct Recorder {
        refreshed: Mutex<Vec<Container>>,
        missing: Vec<Container>,
    }

    impl RelationStore for Recorder {
        async fn exists(&self, _: Uuid, _: ResourceKind, _: Uuid) -> UpkeepResult<bool> {
            Ok(true)
        }

        async fn count_dependents(&self, _: Uuid, _: Container, _: Dependent) -> UpkeepResult<u64> {
            Ok(0)
        }

        async fn refresh_counter(&self, _: Uuid, container: Container) -> UpkeepResult<u64> {
            if self.missing.contains(&container) {
                return Err(UpkeepError::not_found("location", container.id()));
            }
            self.refreshed.lock().unwrap().push(container);
            Ok(0)
        }

        async fn delete_unreferenced(&self, _: Uuid, _: Container) -> UpkeepResult<bool> {
            Ok(true)
        }
    }

    #[tokio::test]
    async fn each_counted_container_is_refreshed_once() {
        let store = Recorder::default();
        let a = Container::Location(Uuid::new_v4());
        let b = Container::Department(Uuid::new_v4());
        let uncounted = Container::Supplier(Uuid::new_v4());

        CountTracker::new(&store)
            .recompute_all(Uuid::new_v4(), &[a, b, a, uncounted])
            .await;

        assert_eq!(*store.refreshed.lock().unwrap(), vec![a, b]);
    }

    #[tokio::test]
    async fn vanished_containers_are_skipped() {
        let gone = Container::Location(Uuid::new_v4());
        let kept = Container::Location(Uuid::new_v4());
        let store = Recorder {
            missing: vec![gone],
            ..Default::default()
        };

        CountTracker::new(&store)
            .recompute_all(Uuid::new_v4(), &[gone, kept])
            .await;

        assert_eq!(*store.refreshed.lock().unwrap(), vec![kept]);
    }
}

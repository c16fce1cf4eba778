//! Pairing Store (C5): a thin, validated facade in front of [`Store`]'s
//! pairing table — the uniqueness invariant on `(venueId, plannedMountId)`
//! is enforced structurally by [`Store::upsert_pairing`]'s key, not
//! re-checked here.

use crate::store::Store;
use hyperspace_protocol::error::OrchestratorError;
use hyperspace_protocol::model::Pairing;
use std::sync::Arc;

pub struct PairingStore {
    store: Arc<Store>,
}

impl PairingStore {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    pub async fn list(&self, venue_id: &str, gateway_id: Option<&str>) -> Vec<Pairing> {
        self.store.list_pairings(venue_id, gateway_id).await
    }

    pub async fn upsert(
        &self,
        venue_id: String,
        gateway_id: String,
        planned_mount_id: String,
        sensor_id: String,
        sensor_address: Option<String>,
    ) -> Result<Pairing, OrchestratorError> {
        if planned_mount_id.is_empty() || sensor_id.is_empty() {
            return Err(OrchestratorError::BadRequest(
                "plannedMountId and sensorId are required".to_string(),
            ));
        }
        let pairing = Pairing {
            id: String::new(),
            venue_id,
            gateway_id,
            planned_mount_id,
            sensor_id,
            sensor_address,
        };
        Ok(self.store.upsert_pairing(pairing).await)
    }

    pub async fn remove_by_planned_mount(&self, venue_id: &str, planned_mount_id: &str) {
        self.store.remove_pairing_by_mount(venue_id, planned_mount_id).await;
    }

    /// Deletes pairings whose `plannedMountId` resolves in neither the auto
    /// nor manual planned-mount sources, per spec.md §4.5.
    pub async fn sweep_orphans(&self, venue_id: &str) -> usize {
        self.store.sweep_orphan_pairings(venue_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> Arc<Store> {
        let dir = std::env::temp_dir().join(format!("hyperspace-pairing-test-{}", uuid::Uuid::new_v4()));
        Arc::new(Store::load(dir.to_str().unwrap()).unwrap())
    }

    #[tokio::test]
    async fn upsert_rejects_empty_identifiers() {
        let pairings = PairingStore::new(test_store());
        let result = pairings
            .upsert("v1".into(), "g1".into(), String::new(), "s1".into(), None)
            .await;
        assert!(matches!(result, Err(OrchestratorError::BadRequest(_))));
    }

    #[tokio::test]
    async fn upsert_then_list_round_trips() {
        let pairings = PairingStore::new(test_store());
        pairings
            .upsert("v1".into(), "g1".into(), "m1".into(), "s1".into(), None)
            .await
            .unwrap();
        let listed = pairings.list("v1", Some("g1")).await;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].sensor_id, "s1");
    }
}

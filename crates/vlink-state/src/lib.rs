//! State store (C8): per-vehicle sectioned snapshot, deterministic
//! merge, optimistic overlays.
//!
//! Concurrency shape: one `RwLock` over the top-level vin→vehicle map
//! (write-locked only to insert a vehicle seen for the first time), and
//! one `Mutex` per `(vin, section)` so applies to the same section are
//! serialized while applies to different sections of the same vehicle
//! proceed concurrently, per the ordering rules.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use vlink_types::{
    is_absent_sentinel, normalize_field, now_epoch_ms, FieldOrigin, FieldValue, Section,
    SectionEvent, SectionSnapshot, Vin,
};

struct VehicleEntry {
    sections: HashMap<Section, Mutex<SectionSnapshot>>,
}

impl VehicleEntry {
    fn new() -> Self {
        let sections = Section::ALL
            .into_iter()
            .map(|s| (s, Mutex::new(SectionSnapshot::default())))
            .collect();
        Self { sections }
    }
}

#[derive(Default)]
pub struct StateStore {
    vehicles: RwLock<HashMap<Vin, Arc<VehicleEntry>>>,
    sequence: AtomicU64,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn vehicle(&self, vin: &Vin) -> Arc<VehicleEntry> {
        if let Some(entry) = self.vehicles.read().await.get(vin) {
            return entry.clone();
        }
        let mut vehicles = self.vehicles.write().await;
        vehicles
            .entry(vin.clone())
            .or_insert_with(|| Arc::new(VehicleEntry::new()))
            .clone()
    }

    /// Merges `event` into the store. For each field: adopt the
    /// incoming value iff `incoming.observed_at >= stored.observed_at`,
    /// or the stored field is an optimistic overlay and the incoming
    /// event is not. An incoming absent-sentinel clears the field
    /// instead of being stored.
    pub async fn apply(&self, event: SectionEvent) {
        let vehicle = self.vehicle(&event.vin).await;
        let mut snapshot = vehicle.sections[&event.section].lock().await;

        for (key, raw) in event.fields {
            let adopt = match snapshot.fields.get(&key) {
                None => true,
                Some(existing) => {
                    event.observed_at >= existing.observed_at
                        || (existing.origin == FieldOrigin::Optimistic
                            && event.origin != FieldOrigin::Optimistic)
                }
            };
            if !adopt {
                continue;
            }

            let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);
            match normalize_field(&key, raw) {
                Some(value) => {
                    snapshot.fields.insert(
                        key,
                        FieldValue {
                            value,
                            origin: event.origin,
                            observed_at: event.observed_at,
                            expires_at: None,
                            sequence,
                        },
                    );
                }
                None => {
                    snapshot.fields.remove(&key);
                }
            }
        }
    }

    /// Writes optimistic fields for `vin`/`section`, each expiring
    /// `ttl_ms` from now. Used on command success to project intent
    /// ahead of the next telemetry update.
    pub async fn overlay(&self, vin: &Vin, section: Section, fields: HashMap<String, serde_json::Value>, ttl_ms: u64) {
        let vehicle = self.vehicle(vin).await;
        let mut snapshot = vehicle.sections[&section].lock().await;
        let now = now_epoch_ms();
        for (key, value) in fields {
            if is_absent_sentinel(&key, &value) {
                continue;
            }
            let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);
            snapshot.fields.insert(
                key,
                FieldValue {
                    value,
                    origin: FieldOrigin::Optimistic,
                    observed_at: now,
                    expires_at: Some(now + ttl_ms),
                    sequence,
                },
            );
        }
    }

    /// Returns an immutable copy of the section with expired overlays
    /// lazily dropped.
    pub async fn get_section(&self, vin: &Vin, section: Section) -> SectionSnapshot {
        let vehicle = self.vehicle(vin).await;
        let mut snapshot = vehicle.sections[&section].lock().await;
        let now = now_epoch_ms();
        snapshot.fields.retain(|_, field| !field.is_expired(now));
        snapshot.clone()
    }
}

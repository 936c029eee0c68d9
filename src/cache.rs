use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::entities::{reservation, trip};

/// Read cache for rows keyed by id. Entries expire after `ttl` and are
/// dropped explicitly by every mutation that touches them.
///
/// Every drop bumps a generation counter. Read-through fills capture it
/// before going to the store and use [`EntityCache::insert_if_current`], so a
/// row read before a concurrent mutation never lands after its invalidation.
pub struct EntityCache<T> {
    ttl: Duration,
    slots: RwLock<Slots<T>>,
}

struct Slots<T> {
    generation: u64,
    entries: HashMap<Uuid, (Instant, T)>,
}

impl<T: Clone> EntityCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slots: RwLock::new(Slots {
                generation: 0,
                entries: HashMap::new(),
            }),
        }
    }

    /// Fresh value for `id`. An expired entry is evicted on the way out.
    pub fn get(&self, id: &Uuid) -> Option<T> {
        {
            let slots = self.slots.read().ok()?;
            let (stored_at, value) = slots.entries.get(id)?;
            if stored_at.elapsed() <= self.ttl {
                return Some(value.clone());
            }
        }

        if let Ok(mut slots) = self.slots.write() {
            let expired = slots
                .entries
                .get(id)
                .is_some_and(|(stored_at, _)| stored_at.elapsed() > self.ttl);
            if expired {
                slots.entries.remove(id);
            }
        }
        None
    }

    pub fn generation(&self) -> u64 {
        self.slots.read().map(|s| s.generation).unwrap_or(u64::MAX)
    }

    pub fn insert(&self, id: Uuid, value: T) {
        if let Ok(mut slots) = self.slots.write() {
            Self::store(&mut slots, self.ttl, id, value);
        }
    }

    /// Insert only if nothing was invalidated since `generation` was read.
    /// Returns whether the value was stored.
    pub fn insert_if_current(&self, id: Uuid, value: T, generation: u64) -> bool {
        let Ok(mut slots) = self.slots.write() else {
            return false;
        };
        if slots.generation != generation {
            return false;
        }
        Self::store(&mut slots, self.ttl, id, value);
        true
    }

    fn store(slots: &mut Slots<T>, ttl: Duration, id: Uuid, value: T) {
        slots.entries.retain(|_, (stored_at, _)| stored_at.elapsed() <= ttl);
        slots.entries.insert(id, (Instant::now(), value));
    }

    pub fn invalidate(&self, id: &Uuid) {
        if let Ok(mut slots) = self.slots.write() {
            slots.generation = slots.generation.wrapping_add(1);
            slots.entries.remove(id);
        }
    }

    pub fn clear(&self) {
        if let Ok(mut slots) = self.slots.write() {
            slots.generation = slots.generation.wrapping_add(1);
            slots.entries.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.slots.read().map(|s| s.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct RecordCache {
    pub trips: EntityCache<trip::Model>,
    pub reservations: EntityCache<reservation::Model>,
}

impl RecordCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            trips: EntityCache::new(ttl),
            reservations: EntityCache::new(ttl),
        }
    }

    /// Drop a trip and, when given, its reservation.
    pub fn invalidate_pair(&self, trip_id: Uuid, reservation_id: Option<Uuid>) {
        self.trips.invalidate(&trip_id);
        if let Some(id) = reservation_id {
            self.reservations.invalidate(&id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_returns_inserted_value() {
        let cache = EntityCache::new(Duration::from_secs(60));
        let id = Uuid::new_v4();
        cache.insert(id, "booked".to_string());

        assert_eq!(cache.get(&id).as_deref(), Some("booked"));
        assert_eq!(cache.get(&Uuid::new_v4()), None);
    }

    #[test]
    fn test_invalidate_forgets_entry() {
        let cache = EntityCache::new(Duration::from_secs(60));
        let id = Uuid::new_v4();
        cache.insert(id, 1);
        cache.invalidate(&id);

        assert_eq!(cache.get(&id), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_expired_entries_are_not_served() {
        let cache = EntityCache::new(Duration::ZERO);
        let id = Uuid::new_v4();
        cache.insert(id, 1);
        std::thread::sleep(Duration::from_millis(2));

        assert_eq!(cache.get(&id), None);
    }

    #[test]
    fn test_expired_entry_is_evicted_on_read() {
        let cache = EntityCache::new(Duration::from_millis(1));
        let id = Uuid::new_v4();
        cache.insert(id, 1);
        std::thread::sleep(Duration::from_millis(5));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&id), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_insert_sweeps_expired_entries() {
        let cache = EntityCache::new(Duration::from_millis(1));
        for _ in 0..3 {
            cache.insert(Uuid::new_v4(), 1);
        }
        std::thread::sleep(Duration::from_millis(5));
        cache.insert(Uuid::new_v4(), 2);

        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_fill_started_before_invalidation_is_discarded() {
        let cache = EntityCache::new(Duration::from_secs(60));
        let id = Uuid::new_v4();

        let seen = cache.generation();
        // a mutation commits and drops the id while the stale row is in flight
        cache.invalidate(&id);
        assert!(!cache.insert_if_current(id, "booked".to_string(), seen));
        assert_eq!(cache.get(&id), None);

        let seen = cache.generation();
        assert!(cache.insert_if_current(id, "completed".to_string(), seen));
        assert_eq!(cache.get(&id).as_deref(), Some("completed"));
    }

    #[test]
    fn test_clear_also_discards_pending_fills() {
        let cache = EntityCache::new(Duration::from_secs(60));
        let seen = cache.generation();
        cache.clear();

        assert!(!cache.insert_if_current(Uuid::new_v4(), 1, seen));
        assert!(cache.is_empty());
    }
}

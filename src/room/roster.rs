use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::RwLock;

use crate::participant::Participant;

struct RosterEntry {
    seq: u64,
    participant: Arc<dyn Participant>,
}

/// Concurrent name -> participant map remembering join order
///
/// Every accessor returns owned snapshots, so no lock is ever held while a
/// participant is being called.
///
/// A name is claimed with [`Roster::reserve`] before it is rostered. Claimed
/// and rostered names are checked together, so two joins can never both
/// hold the same name.
pub(crate) struct Roster {
    entries: RwLock<HashMap<String, RosterEntry>>,
    pending: Mutex<HashSet<String>>,
    next_seq: AtomicU64,
}

impl Roster {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            pending: Mutex::new(HashSet::new()),
            next_seq: AtomicU64::new(0),
        }
    }

    fn pending(&self) -> MutexGuard<'_, HashSet<String>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// All participants in join order
    pub async fn snapshot(&self) -> Vec<Arc<dyn Participant>> {
        let entries = self.entries.read().await;
        let mut ordered: Vec<&RosterEntry> = entries.values().collect();
        ordered.sort_by_key(|entry| entry.seq);
        ordered
            .into_iter()
            .map(|entry| entry.participant.clone())
            .collect()
    }

    pub async fn get(&self, name: &str) -> Option<Arc<dyn Participant>> {
        self.entries
            .read()
            .await
            .get(name)
            .map(|entry| entry.participant.clone())
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Claims `name` for a join in progress. Returns `None` if the name is
    /// rostered or already claimed. The claim lapses when the reservation is
    /// dropped without being committed.
    pub async fn reserve(&self, name: &str) -> Option<NameReservation<'_>> {
        let entries = self.entries.read().await;
        let mut pending = self.pending();
        if entries.contains_key(name) || !pending.insert(name.to_string()) {
            return None;
        }

        Some(NameReservation {
            roster: self,
            name: name.to_string(),
        })
    }

    pub async fn remove(&self, name: &str) -> Option<Arc<dyn Participant>> {
        self.entries
            .write()
            .await
            .remove(name)
            .map(|entry| entry.participant)
    }

    /// Removes `name` only if it is still the entry inserted with `seq`
    pub async fn remove_if_seq(&self, name: &str, seq: u64) -> Option<Arc<dyn Participant>> {
        let mut entries = self.entries.write().await;
        match entries.get(name) {
            Some(entry) if entry.seq == seq => entries.remove(name).map(|entry| entry.participant),
            _ => None,
        }
    }

    /// Empties the roster, returning what was in it in join order
    pub async fn drain(&self) -> Vec<Arc<dyn Participant>> {
        let mut drained: Vec<RosterEntry> = self
            .entries
            .write()
            .await
            .drain()
            .map(|(_, entry)| entry)
            .collect();
        drained.sort_by_key(|entry| entry.seq);
        drained.into_iter().map(|entry| entry.participant).collect()
    }
}

/// Exclusive claim on a participant name, held while a join is in flight
pub(crate) struct NameReservation<'a> {
    roster: &'a Roster,
    name: String,
}

impl NameReservation<'_> {
    /// Rosters `participant` under the reserved name and returns its join
    /// sequence number
    pub async fn commit(self, participant: Arc<dyn Participant>) -> u64 {
        let mut entries = self.roster.entries.write().await;
        let seq = self.roster.next_seq.fetch_add(1, Ordering::SeqCst);
        entries.insert(self.name.clone(), RosterEntry { seq, participant });
        seq
    }
}

impl Drop for NameReservation<'_> {
    fn drop(&mut self) {
        self.roster.pending().remove(&self.name);
    }
}

//! Fixed-capacity session slot table.
//!
//! Each slot owns a bounded, capacity-1 mailbox feeding its worker. The
//! mailbox replaces the shared pending-request buffer + condition-variable
//! pattern: a second request for a session whose first is still pending is
//! rejected, never silently overwritten, and installing a request for one
//! session never contends with another session's worker.
//!
//! The slot-state lock covers only allocate/release/validate transitions;
//! it is never held across conduit I/O or storage-engine calls.

use parking_lot::Mutex;
use tokio::sync::mpsc;

use fifofs_proto::SessionId;

use crate::error::{Result, ServerError};

/// A raw, undecoded request as read off the inbound conduit (operation byte
/// included). Owned by the router until submitted, then by the worker.
pub type RawMessage = Vec<u8>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotState {
    Free,
    Mounted,
}

/// The session registry: slot states plus one mailbox sender per slot.
pub struct Registry {
    slots: Mutex<Vec<SlotState>>,
    mailboxes: Vec<mpsc::Sender<RawMessage>>,
}

impl Registry {
    /// Creates a registry with `capacity` slots, returning the per-slot
    /// mailbox receivers for the worker pool. All slots start Free.
    pub fn new(capacity: usize) -> (Self, Vec<mpsc::Receiver<RawMessage>>) {
        let mut mailboxes = Vec::with_capacity(capacity);
        let mut receivers = Vec::with_capacity(capacity);
        for _ in 0..capacity {
            // Capacity 1: at most one pending request per session.
            let (tx, rx) = mpsc::channel(1);
            mailboxes.push(tx);
            receivers.push(rx);
        }
        (
            Self {
                slots: Mutex::new(vec![SlotState::Free; capacity]),
                mailboxes,
            },
            receivers,
        )
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.mailboxes.len()
    }

    /// Number of currently mounted sessions.
    pub fn mounted_count(&self) -> usize {
        self.slots
            .lock()
            .iter()
            .filter(|s| **s == SlotState::Mounted)
            .count()
    }

    /// Whether `id` names a mounted session.
    pub fn is_mounted(&self, id: SessionId) -> bool {
        self.slots
            .lock()
            .get(id.as_u32() as usize)
            .is_some_and(|s| *s == SlotState::Mounted)
    }

    /// Claims the first Free slot (linear scan) and marks it Mounted.
    ///
    /// The slot is marked before this returns, so a racing Mount cannot be
    /// handed the same slot.
    pub fn allocate(&self) -> Result<SessionId> {
        let mut slots = self.slots.lock();
        for (idx, state) in slots.iter_mut().enumerate() {
            if *state == SlotState::Free {
                *state = SlotState::Mounted;
                return Ok(SessionId::new(idx as u32));
            }
        }
        Err(ServerError::SessionFull)
    }

    /// Returns a slot to Free.
    pub fn release(&self, id: SessionId) -> Result<()> {
        let mut slots = self.slots.lock();
        match slots.get_mut(id.as_u32() as usize) {
            Some(state @ SlotState::Mounted) => {
                *state = SlotState::Free;
                Ok(())
            }
            _ => Err(ServerError::InvalidSession(id.as_u32())),
        }
    }

    /// Hands a raw request to the owning session's worker.
    ///
    /// Validates that the id names a mounted slot, then installs the message
    /// in the capacity-1 mailbox. A full mailbox means the client violated
    /// the one-request-in-flight discipline and the submission is rejected.
    pub fn submit(&self, id: SessionId, msg: RawMessage) -> Result<()> {
        if !self.is_mounted(id) {
            return Err(ServerError::InvalidSession(id.as_u32()));
        }
        let tx = &self.mailboxes[id.as_u32() as usize];
        match tx.try_send(msg) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                Err(ServerError::SessionBusy(id.as_u32()))
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                Err(ServerError::WorkerGone(id.as_u32()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_allocate_yields_distinct_ids_in_range() {
        let (registry, _rx) = Registry::new(4);
        let mut seen = Vec::new();
        for _ in 0..4 {
            let id = registry.allocate().unwrap();
            assert!((id.as_u32() as usize) < 4);
            assert!(!seen.contains(&id));
            seen.push(id);
        }
    }

    #[test]
    fn test_allocate_when_full_leaves_table_unchanged() {
        let (registry, _rx) = Registry::new(2);
        registry.allocate().unwrap();
        registry.allocate().unwrap();
        assert!(matches!(
            registry.allocate().unwrap_err(),
            ServerError::SessionFull
        ));
        assert_eq!(registry.mounted_count(), 2);
    }

    #[test]
    fn test_release_frees_slot_for_reuse() {
        let (registry, _rx) = Registry::new(1);
        let id = registry.allocate().unwrap();
        registry.release(id).unwrap();
        assert_eq!(registry.mounted_count(), 0);
        let again = registry.allocate().unwrap();
        assert_eq!(again, id);
    }

    #[test]
    fn test_release_of_free_or_unknown_slot_fails() {
        let (registry, _rx) = Registry::new(1);
        assert!(matches!(
            registry.release(SessionId::new(0)).unwrap_err(),
            ServerError::InvalidSession(0)
        ));
        assert!(matches!(
            registry.release(SessionId::new(99)).unwrap_err(),
            ServerError::InvalidSession(99)
        ));
    }

    #[test]
    fn test_submit_rejects_unmounted_session() {
        let (registry, _rx) = Registry::new(2);
        let err = registry.submit(SessionId::new(1), vec![2]).unwrap_err();
        assert!(matches!(err, ServerError::InvalidSession(1)));
    }

    #[test]
    fn test_submit_rejects_overlapping_request() {
        let (registry, _rx) = Registry::new(1);
        let id = registry.allocate().unwrap();
        registry.submit(id, vec![1]).unwrap();
        // The worker has not drained the mailbox: second submit is Busy.
        let err = registry.submit(id, vec![2]).unwrap_err();
        assert!(matches!(err, ServerError::SessionBusy(0)));
    }

    #[test]
    fn test_submit_delivers_to_owning_mailbox_only() {
        let (registry, mut rx) = Registry::new(2);
        let a = registry.allocate().unwrap();
        let b = registry.allocate().unwrap();
        registry.submit(a, vec![0xAA]).unwrap();

        assert_eq!(rx[a.as_u32() as usize].try_recv().unwrap(), vec![0xAA]);
        assert!(rx[b.as_u32() as usize].try_recv().is_err());
    }

    #[test]
    fn test_concurrent_mounts_get_distinct_ids() {
        let (registry, _rx) = Registry::new(8);
        let registry = Arc::new(registry);
        let mut joins = Vec::new();
        for _ in 0..8 {
            let r = Arc::clone(&registry);
            joins.push(std::thread::spawn(move || r.allocate().unwrap()));
        }
        let mut ids: Vec<u32> = joins
            .into_iter()
            .map(|j| j.join().unwrap().as_u32())
            .collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 8);
    }
}

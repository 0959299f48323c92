//! Version/Identity Ledger
//!
//! Every tracked container receives a stable [`ObjectId`] handle when it is
//! wrapped. Bookkeeping for that handle lives in a dense arena owned by the
//! runtime:
//!
//! - a mutation version, bumped on every committed structural mutation, which
//!   gives O(1) "did anything change" checks without deep comparison;
//! - an identity token, assigned lazily on first need (usually the first
//!   reconciliation pass) from a process-wide counter, so tokens are never
//!   reused even across runtimes.
//!
//! Slots are recycled after an object is released; the generation counter in
//! the handle makes stale handles read as "not live" instead of aliasing the
//! slot's new occupant.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Stable handle of a tracked container inside one runtime's ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId {
    index: u32,
    generation: u32,
}

impl ObjectId {
    /// Slot index in the ledger arena.
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "obj#{}", self.index)?;
        if self.generation > 0 {
            write!(f, "g{}", self.generation)?;
        }
        Ok(())
    }
}

/// Mint a new identity token. Never returns the same value twice.
fn next_identity() -> u64 {
    static COUNTER: AtomicU64 = AtomicU64::new(1);
    COUNTER.fetch_add(1, Ordering::Relaxed)
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    live: bool,
    version: u64,
    identity: Option<u64>,
}

/// Dense arena of per-object versions and identity tokens.
#[derive(Debug, Default)]
pub struct Ledger {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a slot for a newly wrapped container.
    pub fn allocate(&mut self) -> ObjectId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.live = true;
            slot.version = 0;
            slot.identity = None;
            return ObjectId {
                index,
                generation: slot.generation,
            };
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            live: true,
            version: 0,
            identity: None,
        });
        ObjectId {
            index,
            generation: 0,
        }
    }

    /// Release a slot. Returns false if the handle was already stale.
    pub fn release(&mut self, id: ObjectId) -> bool {
        match self.slot_mut(id) {
            Some(slot) => {
                slot.live = false;
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(id.index);
                true
            }
            None => false,
        }
    }

    pub fn is_live(&self, id: ObjectId) -> bool {
        self.slot(id).is_some()
    }

    /// Current mutation version, or 0 for a stale handle.
    pub fn version(&self, id: ObjectId) -> u64 {
        self.slot(id).map(|s| s.version).unwrap_or(0)
    }

    /// Record one committed mutation and return the new version.
    pub fn bump(&mut self, id: ObjectId) -> u64 {
        match self.slot_mut(id) {
            Some(slot) => {
                slot.version += 1;
                slot.version
            }
            None => 0,
        }
    }

    /// Identity token for the object, minted on first request.
    pub fn identity(&mut self, id: ObjectId) -> Option<u64> {
        let slot = self.slot_mut(id)?;
        Some(*slot.identity.get_or_insert_with(next_identity))
    }

    /// Number of live slots.
    pub fn live_count(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Release every slot at once (owner teardown).
    pub fn clear(&mut self) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.live {
                slot.live = false;
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(index as u32);
            }
        }
    }

    fn slot(&self, id: ObjectId) -> Option<&Slot> {
        self.slots
            .get(id.index as usize)
            .filter(|s| s.live && s.generation == id.generation)
    }

    fn slot_mut(&mut self, id: ObjectId) -> Option<&mut Slot> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|s| s.live && s.generation == id.generation)
    }
}

/// Mint an identity token for a value that has no live ledger slot.
pub(crate) fn detached_identity() -> u64 {
    next_identity()
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

//! Single-slot prevote store.

use feeder_types::{Prevote, VotingPeriod};
use std::sync::{Arc, PoisonError, RwLock};

/// Owner handle of the prevote slot.
///
/// Deliberately not `Clone`: the vote cycle engine is the only writer.
/// Diagnostics and tests observe the slot through [`PrevoteReader`].
pub struct PrevoteStore {
    slot: Arc<RwLock<Option<Prevote>>>,
}

/// Read-only view of a [`PrevoteStore`], safe to share across tasks.
#[derive(Clone)]
pub struct PrevoteReader {
    slot: Arc<RwLock<Option<Prevote>>>,
}

impl PrevoteStore {
    pub fn new() -> Self {
        Self {
            slot: Arc::new(RwLock::new(None)),
        }
    }

    /// Hand out a read-only view of this store.
    pub fn reader(&self) -> PrevoteReader {
        PrevoteReader {
            slot: Arc::clone(&self.slot),
        }
    }

    /// The prevote committed for `period`, if that is what the slot holds.
    pub fn get(&self, period: VotingPeriod) -> Option<Prevote> {
        read_slot(&self.slot).filter(|p| p.period == period)
    }

    /// Whatever the slot holds, regardless of period.
    pub fn latest(&self) -> Option<Prevote> {
        read_slot(&self.slot)
    }

    /// Store a new prevote, returning the entry it displaced.
    pub fn put(&mut self, prevote: Prevote) -> Option<Prevote> {
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        let displaced = slot.replace(prevote);
        if let Some(old) = &displaced {
            tracing::debug!(period = %old.period, "prevote store: replaced previous entry");
        }
        displaced
    }

    /// Remove the entry for `period`; entries for other periods are left alone.
    pub fn remove(&mut self, period: VotingPeriod) -> Option<Prevote> {
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|p| p.period == period) {
            slot.take()
        } else {
            None
        }
    }

    /// Drop the entry if it belongs to a period before `period`.
    pub fn prune_before(&mut self, period: VotingPeriod) -> Option<Prevote> {
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|p| p.period < period) {
            slot.take()
        } else {
            None
        }
    }

    /// Empty the slot, returning what it held.
    pub fn clear(&mut self) -> Option<Prevote> {
        self.slot
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    pub fn is_empty(&self) -> bool {
        read_slot(&self.slot).is_none()
    }
}

impl Default for PrevoteStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PrevoteReader {
    /// The prevote held for `period`, if any.
    pub fn get(&self, period: VotingPeriod) -> Option<Prevote> {
        read_slot(&self.slot).filter(|p| p.period == period)
    }

    /// Whatever the slot holds.
    pub fn latest(&self) -> Option<Prevote> {
        read_slot(&self.slot)
    }

    /// Period of the held prevote.
    pub fn period(&self) -> Option<VotingPeriod> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|p| p.period)
    }

    pub fn is_empty(&self) -> bool {
        self.period().is_none()
    }
}

fn read_slot(slot: &RwLock<Option<Prevote>>) -> Option<Prevote> {
    slot.read().unwrap_or_else(PoisonError::into_inner).clone()
}

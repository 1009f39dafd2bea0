//! Apply a local change before the server confirms it, undo it if the
//! server says no.

/// A local change that is waiting on its remote counterpart.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "an optimistic change must be committed or rolled back"]
pub struct Optimistic<T> {
    previous: T,
    applied: T,
}

impl<T: Clone + PartialEq> Optimistic<T> {
    /// Write `next` into `slot` immediately, remembering what was there.
    pub fn apply(slot: &mut T, next: T) -> Self {
        let previous = std::mem::replace(slot, next.clone());
        Self {
            previous,
            applied: next,
        }
    }

    pub fn previous(&self) -> &T {
        &self.previous
    }

    pub fn applied(&self) -> &T {
        &self.applied
    }

    /// Copy the optimistic value into another view of the same entity.
    pub fn mirror(&self, slot: &mut T) {
        *slot = self.applied.clone();
    }

    pub fn commit(self) -> T {
        self.applied
    }

    /// Restore the old value. A slot that has since been changed to
    /// something else is left alone.
    pub fn rollback(self, slot: &mut T) -> T {
        if *slot == self.applied {
            *slot = self.previous.clone();
        }
        self.previous
    }
}

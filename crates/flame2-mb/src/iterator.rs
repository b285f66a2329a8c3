//! `MessageIterator` — read-only cursor over a board's synced messages.
//!
//! The iterator is a thin front-end over a swappable backend.  The default
//! backend walks the snapshot column in physical order and is immutable; the
//! first `randomise()` call transparently replaces it with a backend whose
//! state is an index permutation over the same column.  Randomized iteration
//! trades speed for order independence, which is an accepted cost.

use std::any::{TypeId, type_name};
use std::sync::Arc;

use rand::seq::SliceRandom;

use crate::column::{Message, MessageColumn};
use crate::{MbError, MbResult};

// ── Backend trait ─────────────────────────────────────────────────────────────

trait IterBackend: Send {
    fn at_end(&self) -> bool;
    fn count(&self) -> usize;
    fn rewind(&mut self);
    fn advance(&mut self) -> bool;
    /// Column index of the current message, `None` at the end.
    fn current_index(&self) -> Option<usize>;
    fn column(&self) -> &Arc<dyn MessageColumn>;
    /// Reshuffle in place.  `false` means the backend is immutable and the
    /// front-end must swap it for a mutable one.
    fn randomise(&mut self) -> bool;
}

// ── Raw-order backend (default, immutable) ────────────────────────────────────

struct RawOrderBackend {
    data: Arc<dyn MessageColumn>,
    pos: usize,
}

impl IterBackend for RawOrderBackend {
    fn at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn count(&self) -> usize {
        self.data.len()
    }

    fn rewind(&mut self) {
        self.pos = 0;
    }

    fn advance(&mut self) -> bool {
        if self.at_end() {
            return false;
        }
        self.pos += 1;
        true
    }

    fn current_index(&self) -> Option<usize> {
        (!self.at_end()).then_some(self.pos)
    }

    fn column(&self) -> &Arc<dyn MessageColumn> {
        &self.data
    }

    fn randomise(&mut self) -> bool {
        false
    }
}

// ── Permutation backend (mutable, randomizable) ───────────────────────────────

struct RandomOrderBackend {
    data: Arc<dyn MessageColumn>,
    perm: Vec<usize>,
    pos: usize,
}

impl RandomOrderBackend {
    fn new(data: Arc<dyn MessageColumn>) -> RandomOrderBackend {
        let perm = (0..data.len()).collect();
        RandomOrderBackend { data, perm, pos: 0 }
    }
}

impl IterBackend for RandomOrderBackend {
    fn at_end(&self) -> bool {
        self.pos >= self.perm.len()
    }

    fn count(&self) -> usize {
        self.perm.len()
    }

    fn rewind(&mut self) {
        self.pos = 0;
    }

    fn advance(&mut self) -> bool {
        if self.at_end() {
            return false;
        }
        self.pos += 1;
        true
    }

    fn current_index(&self) -> Option<usize> {
        self.perm.get(self.pos).copied()
    }

    fn column(&self) -> &Arc<dyn MessageColumn> {
        &self.data
    }

    fn randomise(&mut self) -> bool {
        self.perm.shuffle(&mut rand::thread_rng());
        self.pos = 0;
        true
    }
}

// ── Front-end ─────────────────────────────────────────────────────────────────

/// Read-only cursor over the messages synced at creation time.
pub struct MessageIterator {
    backend: Box<dyn IterBackend>,
}

impl MessageIterator {
    pub(crate) fn over(data: Arc<dyn MessageColumn>) -> MessageIterator {
        MessageIterator {
            backend: Box::new(RawOrderBackend { data, pos: 0 }),
        }
    }

    /// `true` once the cursor has walked past the last message.
    pub fn at_end(&self) -> bool {
        self.backend.at_end()
    }

    /// Total number of messages in the snapshot.
    pub fn count(&self) -> usize {
        self.backend.count()
    }

    /// Reset the cursor to the first message (in the current order).
    pub fn rewind(&mut self) {
        self.backend.rewind();
    }

    /// Advance the cursor.  Returns `true` iff it moved.
    pub fn next(&mut self) -> bool {
        self.backend.advance()
    }

    /// A copy of the current message.
    ///
    /// Fails with `MismatchedType` if `T` is not the board's payload type,
    /// `OutOfRange` once at the end.
    pub fn get<T: Message>(&self) -> MbResult<T> {
        let column = self.backend.column();
        if column.payload_type() != TypeId::of::<T>() {
            return Err(MbError::MismatchedType {
                expected: column.payload_type_name(),
                found: type_name::<T>(),
            });
        }
        let idx = self
            .backend
            .current_index()
            .ok_or_else(|| MbError::OutOfRange("iterator consumed".to_owned()))?;
        let any = column
            .get_any(idx)
            .ok_or_else(|| MbError::OutOfRange("iterator consumed".to_owned()))?;
        match any.downcast::<T>() {
            Ok(v) => Ok(*v),
            Err(_) => Err(MbError::MismatchedType {
                expected: column.payload_type_name(),
                found: type_name::<T>(),
            }),
        }
    }

    /// Shuffle the iteration order and rewind.
    ///
    /// The first call swaps the immutable default backend for a
    /// permutation-backed one; further calls reshuffle.
    pub fn randomise(&mut self) {
        if self.backend.randomise() {
            return;
        }
        let mut mutable = RandomOrderBackend::new(Arc::clone(self.backend.column()));
        mutable.randomise();
        self.backend = Box::new(mutable);
    }
}

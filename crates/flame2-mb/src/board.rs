//! `MessageBoard` and `BoardWriter`.
//!
//! A board owns three things: the `main` column of synced messages, the list
//! of live writers, and a `template` column cloned whenever a new writer is
//! created — which is what lets `writer()` stay untyped at the call site.
//!
//! `main` sits behind an `Arc` snapshot: `sync` builds the merged column and
//! swaps the `Arc`, so any iterator issued earlier keeps reading exactly the
//! messages that were synced when it was created.

use std::any::type_name;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::column::{Message, MessageColumn, TypedMessageColumn};
use crate::iterator::MessageIterator;
use crate::{MbError, MbResult};

// ── BoardWriter ───────────────────────────────────────────────────────────────

/// A private staging buffer accumulating posts until the next sync.
///
/// Handles are counted (`Arc<BoardWriter>`): the board keeps one per live
/// writer and disconnects them all at sync/clear, after which posting
/// through a stale user handle fails with `Disconnected`.
pub struct BoardWriter {
    state: Mutex<WriterState>,
}

struct WriterState {
    staging: Box<dyn MessageColumn>,
    connected: bool,
}

impl BoardWriter {
    fn new(staging: Box<dyn MessageColumn>) -> BoardWriter {
        BoardWriter {
            state: Mutex::new(WriterState {
                staging,
                connected: true,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, WriterState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Stage one message.  Fails with `Disconnected` after the board has
    /// synced or cleared, `MismatchedType` if `T` is not the board's payload.
    pub fn post<T: Message>(&self, msg: T) -> MbResult<()> {
        let mut state = self.lock();
        if !state.connected {
            return Err(MbError::Disconnected);
        }
        let expected = state.staging.payload_type_name();
        match state
            .staging
            .as_any_mut()
            .downcast_mut::<TypedMessageColumn<T>>()
        {
            Some(col) => {
                col.0.push(msg);
                Ok(())
            }
            None => Err(MbError::MismatchedType {
                expected,
                found: type_name::<T>(),
            }),
        }
    }

    /// Number of staged (not yet synced) messages.
    pub fn count(&self) -> usize {
        self.lock().staging.len()
    }

    /// `false` once the board has synced or cleared this writer away.
    pub fn is_connected(&self) -> bool {
        self.lock().connected
    }

    /// Disconnect and hand the staged column to the board.
    fn disconnect_and_take(&self) -> Box<dyn MessageColumn> {
        let mut state = self.lock();
        state.connected = false;
        let empty = state.staging.clone_empty();
        std::mem::replace(&mut state.staging, empty)
    }
}

// ── MessageBoard ──────────────────────────────────────────────────────────────

/// One named, typed message board.
pub struct MessageBoard {
    name: String,
    state: Mutex<BoardState>,
}

struct BoardState {
    main: Arc<dyn MessageColumn>,
    writers: Vec<Arc<BoardWriter>>,
    template: Box<dyn MessageColumn>,
}

impl MessageBoard {
    /// A new empty board for payload type `T`.
    pub fn new<T: Message>(name: &str) -> MessageBoard {
        MessageBoard {
            name: name.to_owned(),
            state: Mutex::new(BoardState {
                main: Arc::new(TypedMessageColumn::<T>::new()),
                writers: Vec::new(),
                template: Box::new(TypedMessageColumn::<T>::new()),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BoardState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The board's registered name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The payload type name (for diagnostics).
    pub fn payload_type_name(&self) -> &'static str {
        self.lock().template.payload_type_name()
    }

    /// Number of synced messages.  Staged posts do not count until `sync`.
    pub fn count(&self) -> usize {
        self.lock().main.len()
    }

    /// Number of currently connected writers.
    pub fn writer_count(&self) -> usize {
        self.lock().writers.len()
    }

    /// Create a fresh connected writer.  Every call returns a distinct
    /// writer; concurrent callers never share staging storage.
    pub fn writer(&self) -> Arc<BoardWriter> {
        let mut state = self.lock();
        let writer = Arc::new(BoardWriter::new(state.template.clone_empty()));
        state.writers.push(Arc::clone(&writer));
        writer
    }

    /// Publish all staged posts: disconnect every writer, append their
    /// staging columns to `main` in writer-creation order, and drop them.
    ///
    /// This is the point at which posted messages become visible to readers.
    /// A sync with no outstanding writers is a no-op.
    pub fn sync(&self) -> MbResult<()> {
        let mut state = self.lock();
        if state.writers.is_empty() {
            return Ok(());
        }

        let staged: usize = state.writers.iter().map(|w| w.count()).sum();
        let mut merged = state.main.clone_column();
        merged.reserve(staged);
        for writer in std::mem::take(&mut state.writers) {
            let mut staging = writer.disconnect_and_take();
            merged.append_from(staging.as_mut())?;
        }
        log::trace!(
            "board {:?}: synced {staged} staged messages (total {})",
            self.name,
            merged.len()
        );
        state.main = Arc::from(merged);
        Ok(())
    }

    /// Disconnect and drop all writers, then empty the board.
    ///
    /// Iterators issued earlier keep their snapshot; the dependency graph is
    /// what guarantees no reader task is in flight at a clear.
    pub fn clear(&self) {
        let mut state = self.lock();
        for writer in std::mem::take(&mut state.writers) {
            writer.disconnect_and_take();
        }
        state.main = Arc::from(state.main.clone_empty());
        log::trace!("board {:?}: cleared", self.name);
    }

    /// An iterator over the messages synced as of this call.
    pub fn messages(&self) -> MessageIterator {
        MessageIterator::over(Arc::clone(&self.lock().main))
    }
}

impl fmt::Debug for MessageBoard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        // At most a handful of rendered messages; boards can hold millions.
        let preview: Vec<String> = (0..state.main.len().min(8))
            .filter_map(|i| state.main.fmt_element(i))
            .collect();
        f.debug_struct("MessageBoard")
            .field("name", &self.name)
            .field("payload", &state.template.payload_type_name())
            .field("synced", &state.main.len())
            .field("writers", &state.writers.len())
            .field("preview", &preview)
            .finish()
    }
}

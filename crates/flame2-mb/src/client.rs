//! Per-task board access control.
//!
//! A [`Proxy`] is the static declaration attached to a task: which messages
//! it may read, which it may post.  At each task run the proxy mints a
//! [`BoardClient`] — the object the access proxy actually calls — holding a
//! fresh writer per postable board.  Fresh writers per run are what keep
//! split sub-tasks on different workers from ever sharing staging storage;
//! read iterators are never cached because user code may randomize them.

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::board::BoardWriter;
use crate::column::Message;
use crate::iterator::MessageIterator;
use crate::manager::MessageBoardManager;
use crate::{MbError, MbResult};

// ── Proxy ─────────────────────────────────────────────────────────────────────

/// A task's declared message permissions.
#[derive(Default, Clone)]
pub struct Proxy {
    reads: FxHashSet<String>,
    posts: FxHashSet<String>,
}

impl Proxy {
    pub fn new() -> Proxy {
        Proxy::default()
    }

    /// Allow the owning task to read message `name`.
    pub fn allow_read(&mut self, name: &str) {
        self.reads.insert(name.to_owned());
    }

    /// Allow the owning task to post message `name`.
    pub fn allow_post(&mut self, name: &str) {
        self.posts.insert(name.to_owned());
    }

    /// Declared read set.
    pub fn reads(&self) -> impl Iterator<Item = &str> {
        self.reads.iter().map(String::as_str)
    }

    /// Declared post set.
    pub fn posts(&self) -> impl Iterator<Item = &str> {
        self.posts.iter().map(String::as_str)
    }

    /// Mint a client for one task run: one fresh writer per postable board.
    pub fn client(&self, boards: &Arc<MessageBoardManager>) -> MbResult<BoardClient> {
        let mut writers = FxHashMap::default();
        for name in &self.posts {
            writers.insert(name.clone(), boards.writer(name)?);
        }
        Ok(BoardClient {
            reads: self.reads.clone(),
            writers,
            boards: Arc::clone(boards),
        })
    }
}

// ── BoardClient ───────────────────────────────────────────────────────────────

/// ACL-scoped board access for one task run on one worker.
pub struct BoardClient {
    reads: FxHashSet<String>,
    writers: FxHashMap<String, Arc<BoardWriter>>,
    boards: Arc<MessageBoardManager>,
}

impl BoardClient {
    /// Post a message.  Fails with `AccessDenied` if the task declared no
    /// post permission for `name`.
    pub fn post<T: Message>(&self, name: &str, msg: T) -> MbResult<()> {
        let writer = self.writers.get(name).ok_or_else(|| MbError::AccessDenied {
            message: name.to_owned(),
            op: "post",
        })?;
        writer.post(msg)
    }

    /// An iterator over a board's synced messages.  Fails with
    /// `AccessDenied` without read permission, `UnknownMessage` if no such
    /// board is registered.
    pub fn messages(&self, name: &str) -> MbResult<MessageIterator> {
        if !self.reads.contains(name) {
            return Err(MbError::AccessDenied {
                message: name.to_owned(),
                op: "read",
            });
        }
        self.boards.messages(name)
    }
}

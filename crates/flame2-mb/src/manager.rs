//! `MessageBoardManager` — the registry of named boards.
//!
//! Shared behind `Arc` between the driver, task manager, and board clients;
//! all methods take `&self` and the boards synchronize internally.

use std::sync::{Arc, RwLock};

use rustc_hash::FxHashMap;

use crate::board::{BoardWriter, MessageBoard};
use crate::column::Message;
use crate::iterator::MessageIterator;
use crate::{MbError, MbResult};

/// Registry mapping message names to boards.
pub struct MessageBoardManager {
    boards: RwLock<FxHashMap<String, Arc<MessageBoard>>>,
}

impl Default for MessageBoardManager {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageBoardManager {
    pub fn new() -> MessageBoardManager {
        MessageBoardManager {
            boards: RwLock::new(FxHashMap::default()),
        }
    }

    /// Register a board for messages of payload type `T`.
    pub fn register<T: Message>(&self, name: &str) -> MbResult<()> {
        let mut boards = self.boards.write().unwrap_or_else(|e| e.into_inner());
        if boards.contains_key(name) {
            return Err(MbError::AlreadyExists(name.to_owned()));
        }
        boards.insert(name.to_owned(), Arc::new(MessageBoard::new::<T>(name)));
        log::debug!("registered message board {name:?}");
        Ok(())
    }

    /// `true` if a board with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.boards
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(name)
    }

    /// Number of registered boards.
    pub fn board_count(&self) -> usize {
        self.boards.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Look up a board by name.
    pub fn board(&self, name: &str) -> MbResult<Arc<MessageBoard>> {
        self.boards
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .cloned()
            .ok_or_else(|| MbError::UnknownMessage(name.to_owned()))
    }

    // ── Uniform board operations ──────────────────────────────────────────

    /// Publish all staged posts on a board.
    pub fn sync(&self, name: &str) -> MbResult<()> {
        self.board(name)?.sync()
    }

    /// Drop all writers and empty a board.
    pub fn clear(&self, name: &str) -> MbResult<()> {
        self.board(name)?.clear();
        Ok(())
    }

    /// Number of synced messages on a board.
    pub fn count(&self, name: &str) -> MbResult<usize> {
        Ok(self.board(name)?.count())
    }

    /// A fresh writer on a board.
    pub fn writer(&self, name: &str) -> MbResult<Arc<BoardWriter>> {
        Ok(self.board(name)?.writer())
    }

    /// An iterator over a board's currently synced messages.
    pub fn messages(&self, name: &str) -> MbResult<MessageIterator> {
        Ok(self.board(name)?.messages())
    }
}

//! Ingestion cursor: the last block number fully processed.
//!
//! The cursor is never persisted on its own. On startup it is re-derived from
//! the highest block stored in the event table, so it can never disagree with
//! what was actually written.

use serde::{Deserialize, Serialize};

/// An inclusive block range processed in one ingestion cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockWindow {
    pub from: u64,
    pub to: u64,
}

impl BlockWindow {
    pub fn new(from: u64, to: u64) -> Self {
        Self { from, to }
    }

    /// Number of blocks in the window.
    pub fn len(&self) -> u64 {
        self.to.saturating_sub(self.from) + 1
    }

    pub fn is_empty(&self) -> bool {
        self.to < self.from
    }

    /// Split `[from, to]` into consecutive windows of at most `batch_size` blocks.
    pub fn split(from: u64, to: u64, batch_size: u64) -> Vec<BlockWindow> {
        let batch = batch_size.max(1);
        let mut windows = Vec::new();
        let mut start = from;
        while start <= to {
            let end = start.saturating_add(batch - 1).min(to);
            windows.push(BlockWindow::new(start, end));
            if end == u64::MAX {
                break;
            }
            start = end + 1;
        }
        windows
    }
}

impl std::fmt::Display for BlockWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.from, self.to)
    }
}

/// The ingestion stream's position in the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    /// Last block number fully processed.
    pub block_number: u64,
}

impl Cursor {
    pub fn new(block_number: u64) -> Self {
        Self { block_number }
    }

    /// Derive the cursor from the store's highest block, or `genesis_block - 1`
    /// when nothing has been stored yet.
    pub fn recover(highest_stored: Option<u64>, genesis_block: u64) -> Self {
        match highest_stored {
            Some(block) => Self::new(block),
            None => Self::new(genesis_block.saturating_sub(1)),
        }
    }

    /// Returns the next block to process (cursor + 1).
    pub fn next_block(&self) -> u64 {
        self.block_number + 1
    }

    /// Compute the next window, capped at `batch_size` blocks and at `latest_block`.
    ///
    /// Returns `None` when there are no new blocks.
    pub fn next_window(&self, latest_block: u64, batch_size: u64) -> Option<BlockWindow> {
        let from = self.next_block();
        if from > latest_block {
            return None;
        }
        let to = from
            .saturating_add(batch_size.max(1) - 1)
            .min(latest_block);
        Some(BlockWindow::new(from, to))
    }

    /// Advance the cursor to the end of a processed window. Never moves backwards.
    pub fn advance(&mut self, to_block: u64) {
        self.block_number = self.block_number.max(to_block);
    }
}

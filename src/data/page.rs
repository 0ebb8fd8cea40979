//! Pages: a batch of aligned blocks.

use crate::data::block::Block;
use crate::error::{ColexecError, Result};
use crate::memory::BlockFactory;

/// An ordered sequence of blocks sharing one position count.
///
/// Cloning a page shares every block, so a page can be fanned out to several
/// expressions; each clone holds its own reference.
#[derive(Debug, Clone)]
pub struct Page {
    position_count: usize,
    blocks: Vec<Block>,
}

impl Page {
    /// Creates a page from at least one block.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for an empty block list and
    /// `PositionCountMismatch` if the blocks are not aligned.
    pub fn new(blocks: Vec<Block>) -> Result<Self> {
        let Some(first) = blocks.first() else {
            return Err(ColexecError::InvalidArgument(
                "a page needs at least one block to infer its position count".into(),
            ));
        };
        let position_count = first.position_count();
        Self::with_position_count(position_count, blocks)
    }

    /// Creates a page with an explicit position count; `blocks` may be empty.
    ///
    /// # Errors
    ///
    /// Returns `PositionCountMismatch` if any block disagrees.
    pub fn with_position_count(position_count: usize, blocks: Vec<Block>) -> Result<Self> {
        if let Some(bad) = blocks.iter().find(|b| b.position_count() != position_count) {
            return Err(ColexecError::PositionCountMismatch {
                expected: position_count,
                actual: bad.position_count(),
            });
        }
        Ok(Self {
            position_count,
            blocks,
        })
    }

    /// Number of positions (rows).
    #[must_use]
    pub fn position_count(&self) -> usize {
        self.position_count
    }

    /// Number of blocks (columns).
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Returns the block at `channel`.
    ///
    /// # Errors
    ///
    /// Returns `ChannelOutOfRange` if there is no such block.
    pub fn block(&self, channel: usize) -> Result<&Block> {
        self.blocks
            .get(channel)
            .ok_or(ColexecError::ChannelOutOfRange {
                channel,
                block_count: self.blocks.len(),
            })
    }

    /// Returns every block.
    #[must_use]
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Consumes the page, returning its blocks.
    #[must_use]
    pub fn into_blocks(self) -> Vec<Block> {
        self.blocks
    }

    /// Returns a page with `block` appended as the last channel.
    ///
    /// # Errors
    ///
    /// Returns `PositionCountMismatch` if `block` is not aligned; both the
    /// page and the block are dropped in that case.
    pub fn append_block(mut self, block: Block) -> Result<Self> {
        if block.position_count() != self.position_count {
            return Err(ColexecError::PositionCountMismatch {
                expected: self.position_count,
                actual: block.position_count(),
            });
        }
        self.blocks.push(block);
        Ok(self)
    }

    /// Returns a page holding shared references to `channels`, in order.
    ///
    /// # Errors
    ///
    /// Returns `ChannelOutOfRange` for an unknown channel.
    pub fn project(&self, channels: &[usize]) -> Result<Self> {
        let blocks = channels
            .iter()
            .map(|&c| self.block(c).cloned())
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            position_count: self.position_count,
            blocks,
        })
    }

    /// Builds a page keeping only `positions` of every block.
    ///
    /// # Errors
    ///
    /// Returns `BudgetExceeded` if the filtered blocks cannot be allocated;
    /// blocks built before the failure are released.
    pub fn filter(&self, factory: &BlockFactory, positions: &[usize]) -> Result<Self> {
        let blocks = self
            .blocks
            .iter()
            .map(|b| b.filter(factory, positions))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            position_count: positions.len(),
            blocks,
        })
    }

    /// Bytes charged for every block of the page.
    #[must_use]
    pub fn ram_bytes_used(&self) -> usize {
        self.blocks.iter().map(Block::ram_bytes_used).sum()
    }
}

//! Item id allocation
//!
//! Outline and plan items share one integer id space. The allocator hands
//! out increasing ids and is re-seeded from existing ids whenever state is
//! loaded or imported. `u32::MAX` is never handed out, so reseeding past
//! the largest id always leaves the allocator on an unused value.

use thiserror::Error;
use tracing::{debug, warn};

/// Largest id an imported or loaded item may carry
pub const MAX_ITEM_ID: u32 = u32::MAX - 1;

/// Raised when the id space is used up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("No item ids left after {last_id}")]
pub struct IdsExhausted {
    pub last_id: u32,
}

/// Issues unique, increasing item ids
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdAllocator {
    next_id: u32,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self { next_id: 1 }
    }
}

impl IdAllocator {
    /// Create an allocator whose next id is `next_id` (minimum 1)
    pub fn new(next_id: u32) -> Self {
        Self { next_id: next_id.max(1) }
    }

    /// Create an allocator positioned after the largest of `ids`
    pub fn from_ids(ids: impl IntoIterator<Item = u32>) -> Self {
        let mut allocator = Self::default();
        allocator.reseed(ids);
        allocator
    }

    /// The id the next call to [`IdAllocator::mint`] will return
    pub fn next_id(&self) -> u32 {
        self.next_id
    }

    /// Take the next id
    pub fn mint(&mut self) -> Result<u32, IdsExhausted> {
        let id = self.next_id;
        if id > MAX_ITEM_ID {
            warn!(%id, "IdAllocator::mint: id space exhausted");
            return Err(IdsExhausted { last_id: id - 1 });
        }
        self.next_id = id + 1;
        debug!(%id, "IdAllocator::mint: minted");
        Ok(id)
    }

    /// Reset to `max(ids) + 1`, or 1 when `ids` is empty
    ///
    /// A maximum of `u32::MAX` leaves the allocator exhausted rather than
    /// pointing at a taken id.
    pub fn reseed(&mut self, ids: impl IntoIterator<Item = u32>) {
        let max = ids.into_iter().max().unwrap_or(0);
        self.next_id = max.saturating_add(1).max(1);
        debug!(next_id = %self.next_id, "IdAllocator::reseed: called");
    }

    /// Back to a fresh session
    pub fn reset(&mut self) {
        self.next_id = 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_starts_at_one() {
        let mut ids = IdAllocator::default();
        assert_eq!(ids.mint(), Ok(1));
        assert_eq!(ids.mint(), Ok(2));
        assert_eq!(ids.next_id(), 3);
    }

    #[test]
    fn test_from_ids_uses_max() {
        let ids = IdAllocator::from_ids([10, 3, 7]);
        assert_eq!(ids.next_id(), 11);
    }

    #[test]
    fn test_from_empty_ids() {
        let ids = IdAllocator::from_ids(std::iter::empty());
        assert_eq!(ids.next_id(), 1);
    }

    #[test]
    fn test_new_clamps_to_one() {
        assert_eq!(IdAllocator::new(0).next_id(), 1);
    }

    #[test]
    fn test_reset() {
        let mut ids = IdAllocator::new(40);
        ids.reset();
        assert_eq!(ids.next_id(), 1);
    }

    #[test]
    fn test_mint_stops_at_the_top_of_the_id_space() {
        let mut ids = IdAllocator::new(MAX_ITEM_ID);
        assert_eq!(ids.mint(), Ok(MAX_ITEM_ID));
        assert_eq!(ids.mint(), Err(IdsExhausted { last_id: MAX_ITEM_ID }));
        assert_eq!(ids.next_id(), u32::MAX);
    }

    #[test]
    fn test_reseed_past_max_id_never_reuses_it() {
        let mut ids = IdAllocator::from_ids([3, u32::MAX]);
        assert!(ids.mint().is_err());
    }
}

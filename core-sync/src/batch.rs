//! Fixed-size, order-preserving batching of update lists.

use bridge_traits::marketplace::{PriceUpdate, StockUpdate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::slice::Chunks;

use crate::error::{Result, SyncError};

/// Which bulk-update endpoint a batch is sent to.
///
/// Ordering puts stock before price, the order batches are dispatched in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchKind {
    Stock,
    Price,
}

impl BatchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchKind::Stock => "stock",
            BatchKind::Price => "price",
        }
    }
}

impl fmt::Display for BatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Copy of a batch whose upload failed, kept for diagnostics and retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailedBatch {
    Stock(Vec<StockUpdate>),
    Price(Vec<PriceUpdate>),
}

impl FailedBatch {
    pub fn kind(&self) -> BatchKind {
        match self {
            FailedBatch::Stock(_) => BatchKind::Stock,
            FailedBatch::Price(_) => BatchKind::Price,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            FailedBatch::Stock(updates) => updates.len(),
            FailedBatch::Price(updates) => updates.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Offer ids contained in the batch, in batch order.
    pub fn offer_ids(&self) -> Vec<&str> {
        match self {
            FailedBatch::Stock(updates) => updates.iter().map(|u| u.offer_id.as_str()).collect(),
            FailedBatch::Price(updates) => updates.iter().map(|u| u.offer_id.as_str()).collect(),
        }
    }
}

/// Batches of at most `size` items over a borrowed slice.
///
/// Iterating does not consume anything: every call to [`Batches::iter`]
/// starts again from the first batch.
#[derive(Debug)]
pub struct Batches<'a, T> {
    items: &'a [T],
    size: usize,
}

impl<'a, T> Clone for Batches<'a, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, T> Copy for Batches<'a, T> {}

impl<'a, T> Batches<'a, T> {
    /// Number of batches, `ceil(items / size)`.
    pub fn len(&self) -> usize {
        self.items.len().div_ceil(self.size)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn batch_size(&self) -> usize {
        self.size
    }

    pub fn iter(&self) -> Chunks<'a, T> {
        self.items.chunks(self.size)
    }
}

impl<'a, T> IntoIterator for Batches<'a, T> {
    type Item = &'a [T];
    type IntoIter = Chunks<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Split `items` into order-preserving batches of at most `size` items.
///
/// ```
/// use core_sync::batch::chunk;
///
/// let items = [1, 2, 3, 4, 5];
/// let batches: Vec<&[i32]> = chunk(&items, 2).unwrap().iter().collect();
/// assert_eq!(batches, vec![&[1, 2][..], &[3, 4][..], &[5][..]]);
/// ```
///
/// # Errors
///
/// [`SyncError::InvalidChunkSize`] when `size` is zero.
pub fn chunk<T>(items: &[T], size: usize) -> Result<Batches<'_, T>> {
    if size == 0 {
        return Err(SyncError::InvalidChunkSize(size));
    }
    Ok(Batches { items, size })
}

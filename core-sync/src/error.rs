use bridge_traits::error::BridgeError;
use thiserror::Error;

use crate::batch::FailedBatch;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Invalid price format: '{text}'")]
    InvalidPriceFormat { text: String },

    #[error("Invalid quantity format: '{text}'")]
    InvalidQuantityFormat { text: String },

    #[error("Invalid chunk size: {0}")]
    InvalidChunkSize(usize),

    #[error("Catalog fetch failed on page {page}: {source}")]
    CatalogFetchFailed {
        page: u32,
        #[source]
        source: BridgeError,
    },

    #[error("Catalog page {page} did not report a total")]
    MissingCatalogTotal { page: u32 },

    #[error("Catalog incomplete: received {received} of {total} offers")]
    IncompleteCatalog { received: u64, total: u64 },

    #[error("{} batch {} upload failed: {}", .batch.kind(), .index, .source)]
    BatchUploadFailed {
        index: usize,
        batch: FailedBatch,
        #[source]
        source: BridgeError,
    },

    #[error("Supplier feed unavailable: {0}")]
    FeedUnavailable(#[source] BridgeError),

    #[error(transparent)]
    Config(#[from] core_runtime::Error),
}

impl SyncError {
    /// Whether the underlying transport failure (timeout, connection, 429 or
    /// 5xx) is worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            SyncError::CatalogFetchFailed { source, .. }
            | SyncError::BatchUploadFailed { source, .. }
            | SyncError::FeedUnavailable(source) => source.is_transient(),
            _ => false,
        }
    }

    /// Whether the run stopped before any batch was dispatched.
    pub fn aborts_run(&self) -> bool {
        !matches!(self, SyncError::BatchUploadFailed { .. })
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;

use std::{error::Error as StdError, io, path::PathBuf};

use crate::{extract::ExtractError, store::StoreError};

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("source '{name}' failed: {source}")]
    Source {
        name: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
    #[error("failed to extract proposal '{id}': {source}")]
    Extract {
        id: String,
        #[source]
        source: ExtractError,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("failed to append to '{}': {source}", path.display())]
    Ledger {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

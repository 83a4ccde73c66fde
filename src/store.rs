use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use crate::extract::Proposal;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("proposal id '{0}' cannot be used as a file name")]
    InvalidId(String),
    #[error("i/o error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to serialize proposal '{id}': {source}")]
    Serialize {
        id: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A flat directory holding one `<id>.json` file per recorded proposal.
///
/// The presence of the file is what marks an id as seen.
#[derive(Debug, Clone)]
pub struct ProposalStore {
    dir: PathBuf,
}

impl ProposalStore {
    pub fn open<P: Into<PathBuf>>(dir: P) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, id: &str) -> Result<PathBuf, StoreError> {
        if !is_valid_id(id) {
            return Err(StoreError::InvalidId(id.to_string()));
        }
        Ok(self.dir.join(format!("{id}.json")))
    }

    pub fn contains(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.path_for(id)?.is_file())
    }

    /// Writes the proposal payload, replacing any previous file for the id.
    pub fn save(&self, proposal: &Proposal) -> Result<PathBuf, StoreError> {
        let path = self.path_for(&proposal.id)?;
        let json =
            serde_json::to_vec_pretty(&proposal.payload).map_err(|source| StoreError::Serialize {
                id: proposal.id.clone(),
                source,
            })?;

        // the final name must only ever point at a complete file
        let tmp_path = self.dir.join(format!(".{}.json.tmp", proposal.id));
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source: io::Error| StoreError::Io { path, source }
        };
        let mut file = fs::File::create(&tmp_path).map_err(io_err(&tmp_path))?;
        file.write_all(&json).map_err(io_err(&tmp_path))?;
        file.sync_all().map_err(io_err(&tmp_path))?;
        fs::rename(&tmp_path, &path).map_err(io_err(&path))?;

        tracing::debug!(id = proposal.id, "wrote '{}'", path.display());
        Ok(path)
    }
}

fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

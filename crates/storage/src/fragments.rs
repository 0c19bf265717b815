use crate::error::StorageError;
use crate::models::Fragment;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::debug;

/// Read-only fragment metadata addressed by vector row.
#[derive(Debug, Clone, Default)]
pub struct FragmentStore {
    fragments: Vec<Fragment>,
}

impl FragmentStore {
    pub fn new(fragments: Vec<Fragment>) -> Self {
        Self { fragments }
    }

    pub fn load(path: &Path) -> Result<Self, StorageError> {
        let file = File::open(path)?;
        let fragments: Vec<Fragment> = serde_json::from_reader(BufReader::new(file))?;
        debug!(path = %path.display(), count = fragments.len(), "loaded fragment metadata");
        Ok(Self::new(fragments))
    }

    pub fn get(&self, id: usize) -> Result<&Fragment, StorageError> {
        self.fragments.get(id).ok_or(StorageError::LookupFailure {
            id,
            count: self.fragments.len(),
        })
    }

    pub fn count(&self) -> usize {
        self.fragments.len()
    }
}

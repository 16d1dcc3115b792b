//! Sled-backed asset store.
//!
//! Records are JSON blobs keyed by asset id. Index trees keep child, seed and
//! project lookups off the full scan; index keys carry a monotonic suffix so
//! prefix scans return insertion order.

use super::{Asset, AssetDraft, AssetStore, FileMetadata};
use crate::error::StoreError;
use crate::types::{AssetId, Seed};
use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::Transactional;
use std::path::Path;
use tracing::debug;

const ASSETS_TREE: &str = "assets";
const CHILDREN_TREE: &str = "children";
const SEED_INDEX_TREE: &str = "seed_index";
const PROJECT_INDEX_TREE: &str = "project_index";

/// Ends a project id in index keys; never valid inside UTF-8
const PROJECT_KEY_TERMINATOR: u8 = 0xFF;

#[derive(Debug, Clone)]
pub struct SledAssetStore {
    db: sled::Db,
    assets: sled::Tree,
    children: sled::Tree,
    seed_index: sled::Tree,
    project_index: sled::Tree,
}

impl SledAssetStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = sled::open(path.as_ref()).map_err(|e| {
            StoreError::Backend(format!(
                "Failed to open sled database at {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_db(db)
    }

    pub fn from_db(db: sled::Db) -> Result<Self, StoreError> {
        let assets = db.open_tree(ASSETS_TREE)?;
        let children = db.open_tree(CHILDREN_TREE)?;
        let seed_index = db.open_tree(SEED_INDEX_TREE)?;
        let project_index = db.open_tree(PROJECT_INDEX_TREE)?;
        Ok(Self {
            db,
            assets,
            children,
            seed_index,
            project_index,
        })
    }

    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }

    fn indexed_key(prefix: &[u8], sequence: u64) -> Vec<u8> {
        let mut key = Vec::with_capacity(prefix.len() + 8);
        key.extend_from_slice(prefix);
        key.extend_from_slice(&sequence.to_be_bytes());
        key
    }

    fn project_prefix(project_id: &str) -> Vec<u8> {
        let mut prefix = project_id.as_bytes().to_vec();
        prefix.push(PROJECT_KEY_TERMINATOR);
        prefix
    }

    fn decode(bytes: &[u8]) -> Result<Asset, StoreError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Resolve index entries (values are asset ids) to records
    fn resolve_index(&self, tree: &sled::Tree, prefix: &[u8]) -> Result<Vec<Asset>, StoreError> {
        let mut assets = Vec::new();
        for entry in tree.scan_prefix(prefix) {
            let (_, id_bytes) = entry?;
            match self.assets.get(&id_bytes)? {
                Some(bytes) => assets.push(Self::decode(&bytes)?),
                None => debug!("Skipping index entry for missing asset"),
            }
        }
        Ok(assets)
    }
}

impl AssetStore for SledAssetStore {
    fn create(&self, draft: AssetDraft) -> Result<Asset, StoreError> {
        let asset = Asset::from_draft(draft);
        let id_key = asset.id.as_bytes().to_vec();
        let value = serde_json::to_vec(&asset)?;
        let seed_key = Self::indexed_key(&asset.seed.to_be_bytes(), self.db.generate_id()?);
        let project_key = Self::indexed_key(
            &Self::project_prefix(&asset.project_id),
            self.db.generate_id()?,
        );
        let child_key = match asset.parent_id {
            Some(parent_id) => Some(Self::indexed_key(
                parent_id.as_bytes(),
                self.db.generate_id()?,
            )),
            None => None,
        };

        (
            &self.assets,
            &self.children,
            &self.seed_index,
            &self.project_index,
        )
            .transaction(|(assets, children, seed_index, project_index)| {
                assets.insert(id_key.as_slice(), value.as_slice())?;
                seed_index.insert(seed_key.as_slice(), id_key.as_slice())?;
                project_index.insert(project_key.as_slice(), id_key.as_slice())?;
                if let Some(child_key) = &child_key {
                    children.insert(child_key.as_slice(), id_key.as_slice())?;
                }
                Ok::<(), ConflictableTransactionError<()>>(())
            })
            .map_err(|e: TransactionError<()>| {
                StoreError::Backend(format!("Failed to write asset {}: {:?}", asset.id, e))
            })?;

        debug!(asset_id = %asset.id, parent_id = ?asset.parent_id, seed = asset.seed, "Stored asset");
        Ok(asset)
    }

    fn get(&self, id: &AssetId) -> Result<Option<Asset>, StoreError> {
        match self.assets.get(id.as_bytes())? {
            Some(bytes) => Ok(Some(Self::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn list_children(&self, parent_id: &AssetId) -> Result<Vec<Asset>, StoreError> {
        self.resolve_index(&self.children, parent_id.as_bytes())
    }

    fn list_by_seed(&self, seed: Seed) -> Result<Vec<Asset>, StoreError> {
        self.resolve_index(&self.seed_index, &seed.to_be_bytes())
    }

    fn list_all(&self) -> Result<Vec<Asset>, StoreError> {
        let mut assets = Vec::new();
        for entry in self.assets.iter() {
            let (_, bytes) = entry?;
            assets.push(Self::decode(&bytes)?);
        }
        assets.sort_by_key(|a| a.created_at);
        Ok(assets)
    }

    fn list_by_project(&self, project_id: &str) -> Result<Vec<Asset>, StoreError> {
        self.resolve_index(&self.project_index, &Self::project_prefix(project_id))
    }

    fn record_file_metadata(
        &self,
        id: &AssetId,
        file: FileMetadata,
    ) -> Result<Asset, StoreError> {
        loop {
            let current = self
                .assets
                .get(id.as_bytes())?
                .ok_or(StoreError::NotFound(*id))?;
            let mut asset = Self::decode(&current)?;
            asset.merge_file_metadata(file.clone());
            let updated = serde_json::to_vec(&asset)?;

            match self
                .assets
                .compare_and_swap(id.as_bytes(), Some(current), Some(updated))?
            {
                Ok(()) => return Ok(asset),
                Err(_) => debug!(asset_id = %id, "Concurrent update, retrying metadata backfill"),
            }
        }
    }
}

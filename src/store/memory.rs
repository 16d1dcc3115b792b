//! In-process asset store.
//!
//! Assets live in an append-only arena; id and parent lookups are indices into it.

use super::{Asset, AssetDraft, AssetStore, FileMetadata};
use crate::error::StoreError;
use crate::types::{AssetId, Seed};
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Default)]
struct Arena {
    assets: Vec<Asset>,
    by_id: HashMap<AssetId, usize>,
    children: HashMap<AssetId, Vec<usize>>,
}

impl Arena {
    fn push(&mut self, asset: Asset) {
        let slot = self.assets.len();
        if let Some(parent_id) = asset.parent_id {
            self.children.entry(parent_id).or_default().push(slot);
        }
        self.by_id.insert(asset.id, slot);
        self.assets.push(asset);
    }

    fn replace(&mut self, slot: usize, asset: Asset) {
        let previous_parent = self.assets[slot].parent_id;
        if previous_parent != asset.parent_id {
            if let Some(parent_id) = previous_parent {
                if let Some(slots) = self.children.get_mut(&parent_id) {
                    slots.retain(|s| *s != slot);
                }
            }
            if let Some(parent_id) = asset.parent_id {
                let slots = self.children.entry(parent_id).or_default();
                slots.push(slot);
                slots.sort_unstable();
            }
        }
        self.assets[slot] = asset;
    }
}

/// Asset store backed by process memory
#[derive(Default)]
pub struct InMemoryAssetStore {
    arena: RwLock<Arena>,
}

impl InMemoryAssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a record produced elsewhere, keeping its id, parent and timestamp.
    ///
    /// An existing asset with the same id is replaced. No lineage checks are
    /// made; the tracker detects cycles and dangling parents on read.
    pub fn import(&self, asset: Asset) {
        let mut arena = self.arena.write();
        match arena.by_id.get(&asset.id).copied() {
            Some(slot) => arena.replace(slot, asset),
            None => arena.push(asset),
        }
    }

    pub fn len(&self) -> usize {
        self.arena.read().assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AssetStore for InMemoryAssetStore {
    fn create(&self, draft: AssetDraft) -> Result<Asset, StoreError> {
        let asset = Asset::from_draft(draft);
        self.arena.write().push(asset.clone());
        Ok(asset)
    }

    fn get(&self, id: &AssetId) -> Result<Option<Asset>, StoreError> {
        let arena = self.arena.read();
        Ok(arena.by_id.get(id).map(|slot| arena.assets[*slot].clone()))
    }

    fn list_children(&self, parent_id: &AssetId) -> Result<Vec<Asset>, StoreError> {
        let arena = self.arena.read();
        Ok(arena
            .children
            .get(parent_id)
            .map(|slots| slots.iter().map(|s| arena.assets[*s].clone()).collect())
            .unwrap_or_default())
    }

    fn list_by_seed(&self, seed: Seed) -> Result<Vec<Asset>, StoreError> {
        let arena = self.arena.read();
        Ok(arena
            .assets
            .iter()
            .filter(|a| a.seed == seed)
            .cloned()
            .collect())
    }

    fn list_all(&self) -> Result<Vec<Asset>, StoreError> {
        Ok(self.arena.read().assets.clone())
    }

    fn record_file_metadata(
        &self,
        id: &AssetId,
        file: FileMetadata,
    ) -> Result<Asset, StoreError> {
        let mut arena = self.arena.write();
        let slot = *arena.by_id.get(id).ok_or(StoreError::NotFound(*id))?;
        let asset = &mut arena.assets[slot];
        asset.merge_file_metadata(file);
        Ok(asset.clone())
    }
}

//! Provenance queries over the parent/child asset graph.
//!
//! Parent links are weak ids maintained by whatever owns the store, so every
//! walk is bounded: a visited set catches cycles and `max_depth` caps chains.

use crate::error::EngineError;
use crate::store::{Asset, AssetStore};
use crate::types::AssetId;
use serde::Serialize;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, warn};

pub const DEFAULT_MAX_LINEAGE_DEPTH: usize = 256;

/// Full provenance view of one asset
#[derive(Debug, Clone, Serialize)]
pub struct LineageReport {
    pub root: Asset,
    /// Root first, requested asset last
    pub chain: Vec<Asset>,
    /// Direct children of the requested asset
    pub children: Vec<Asset>,
    /// All assets reachable below the requested asset
    pub descendant_count: usize,
}

#[derive(Clone)]
pub struct LineageTracker {
    store: Arc<dyn AssetStore>,
    max_depth: usize,
}

impl LineageTracker {
    pub fn new(store: Arc<dyn AssetStore>, max_depth: usize) -> Self {
        Self { store, max_depth }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    fn load(&self, id: &AssetId) -> Result<Asset, EngineError> {
        self.store.get(id)?.ok_or(EngineError::NotFound(*id))
    }

    /// Walk parent links to the root and return the chain root -> ... -> `asset_id`.
    pub fn get_lineage(&self, asset_id: &AssetId) -> Result<Vec<Asset>, EngineError> {
        let start = self.load(asset_id)?;
        let mut visited = HashSet::from([start.id]);
        let mut chain = vec![start];

        while let Some(parent_id) = chain.last().and_then(|a| a.parent_id) {
            if !visited.insert(parent_id) {
                warn!(asset_id = %asset_id, parent_id = %parent_id, "Cycle in parent chain");
                return Err(EngineError::CorruptLineage {
                    asset_id: *asset_id,
                    reason: format!("cycle detected at {}", parent_id),
                });
            }
            if chain.len() >= self.max_depth {
                warn!(asset_id = %asset_id, max_depth = self.max_depth, "Parent chain too deep");
                return Err(EngineError::CorruptLineage {
                    asset_id: *asset_id,
                    reason: format!("chain exceeds maximum depth {}", self.max_depth),
                });
            }
            let parent = self.store.get(&parent_id)?.ok_or_else(|| {
                EngineError::CorruptLineage {
                    asset_id: *asset_id,
                    reason: format!("missing parent {}", parent_id),
                }
            })?;
            chain.push(parent);
        }

        chain.reverse();
        debug!(asset_id = %asset_id, depth = chain.len(), "Resolved lineage");
        Ok(chain)
    }

    /// Direct children of an existing asset.
    pub fn get_children(&self, asset_id: &AssetId) -> Result<Vec<Asset>, EngineError> {
        self.load(asset_id)?;
        Ok(self.store.list_children(asset_id)?)
    }

    /// Check that a new child may hang off `parent_id` and return the parent.
    ///
    /// Walks the prospective chain before any insert; a fresh child id can
    /// never close a cycle, so the walk guards against existing corruption and
    /// the depth bound.
    pub fn ensure_attachable(&self, parent_id: &AssetId) -> Result<Asset, EngineError> {
        let chain = self.get_lineage(parent_id)?;
        if chain.len() + 1 > self.max_depth {
            return Err(EngineError::Validation(format!(
                "Asset {} is at maximum lineage depth {}",
                parent_id, self.max_depth
            )));
        }
        chain
            .into_iter()
            .last()
            .ok_or(EngineError::NotFound(*parent_id))
    }

    pub fn lineage_report(&self, asset_id: &AssetId) -> Result<LineageReport, EngineError> {
        let chain = self.get_lineage(asset_id)?;
        let root = chain
            .first()
            .cloned()
            .ok_or(EngineError::NotFound(*asset_id))?;
        let children = self.store.list_children(asset_id)?;
        let descendant_count = self.count_descendants(asset_id, &children)?;

        Ok(LineageReport {
            root,
            chain,
            children,
            descendant_count,
        })
    }

    fn count_descendants(
        &self,
        asset_id: &AssetId,
        direct: &[Asset],
    ) -> Result<usize, EngineError> {
        let mut seen: HashSet<AssetId> = HashSet::from([*asset_id]);
        let mut queue: VecDeque<(AssetId, usize)> = VecDeque::new();
        for child in direct {
            if seen.insert(child.id) {
                queue.push_back((child.id, 1));
            }
        }

        let mut count = 0;
        while let Some((id, depth)) = queue.pop_front() {
            count += 1;
            if depth >= self.max_depth {
                return Err(EngineError::CorruptLineage {
                    asset_id: *asset_id,
                    reason: format!("descendants exceed maximum depth {}", self.max_depth),
                });
            }
            for child in self.store.list_children(&id)? {
                if seen.insert(child.id) {
                    queue.push_back((child.id, depth + 1));
                }
            }
        }
        Ok(count)
    }
}

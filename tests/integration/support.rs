//! Provider and store doubles shared by the integration tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use seedgrid::matrix::prompt::build_cell_prompt;
use seedgrid::store::InMemoryAssetStore;
use seedgrid::{
    Asset, AspectRatio, AssetDraft, AssetId, AssetStore, EngineConfig, FileMetadata,
    GenerationProvider, ImageResult, MatrixEngine, ProviderError, Seed, StoreError,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// One recorded provider submission
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Submission {
    pub prompt: String,
    pub seed: Seed,
    pub aspect_ratio: String,
}

/// Records every submission; fails, hangs or delays chosen prompts
#[derive(Default)]
pub struct ScriptedProvider {
    calls: Mutex<Vec<Submission>>,
    failing: Mutex<HashSet<String>>,
    hanging: Mutex<HashSet<String>>,
    fail_all: AtomicBool,
    hang_all: AtomicBool,
    staggered: AtomicBool,
    counter: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_all() -> Arc<Self> {
        let provider = Self::default();
        provider.fail_all.store(true, Ordering::SeqCst);
        Arc::new(provider)
    }

    pub fn hanging_all() -> Arc<Self> {
        let provider = Self::default();
        provider.hang_all.store(true, Ordering::SeqCst);
        Arc::new(provider)
    }

    /// Earlier submissions finish later
    pub fn staggered() -> Arc<Self> {
        let provider = Self::default();
        provider.staggered.store(true, Ordering::SeqCst);
        Arc::new(provider)
    }

    pub fn fail_cell(&self, base_prompt: &str, angle: &str, lighting: &str) {
        self.failing
            .lock()
            .insert(build_cell_prompt(base_prompt, angle, lighting));
    }

    pub fn hang_cell(&self, base_prompt: &str, angle: &str, lighting: &str) {
        self.hanging
            .lock()
            .insert(build_cell_prompt(base_prompt, angle, lighting));
    }

    pub fn set_fail_all(&self, fail: bool) {
        self.fail_all.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<Submission> {
        self.calls.lock().clone()
    }

    pub fn sorted_calls(&self) -> Vec<Submission> {
        let mut calls = self.calls();
        calls.sort();
        calls
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    pub fn call_for(&self, prompt: &str) -> Option<Submission> {
        self.calls().into_iter().find(|c| c.prompt == prompt)
    }
}

#[async_trait]
impl GenerationProvider for ScriptedProvider {
    async fn submit(
        &self,
        prompt: &str,
        seed: Seed,
        aspect_ratio: AspectRatio,
    ) -> Result<ImageResult, ProviderError> {
        let index = self.counter.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().push(Submission {
            prompt: prompt.to_string(),
            seed,
            aspect_ratio: aspect_ratio.to_string(),
        });

        if self.hang_all.load(Ordering::SeqCst) || self.hanging.lock().contains(prompt) {
            return std::future::pending().await;
        }
        if self.staggered.load(Ordering::SeqCst) {
            let remaining = 9usize.saturating_sub(index % 9) as u64;
            tokio::time::sleep(Duration::from_millis(remaining * 5)).await;
        }
        if self.fail_all.load(Ordering::SeqCst) || self.failing.lock().contains(prompt) {
            return Err(ProviderError::unknown(format!("scripted failure for '{}'", prompt)));
        }
        Ok(ImageResult::new(format!("https://cdn.test/{}/{}.png", seed, index))
            .with_metadata("provider", "scripted"))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// In-memory store whose writes can be switched off
#[derive(Default)]
pub struct FlakyStore {
    inner: InMemoryAssetStore,
    fail_creates: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_fail_creates(&self, fail: bool) {
        self.fail_creates.store(fail, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }
}

impl AssetStore for FlakyStore {
    fn create(&self, draft: AssetDraft) -> Result<Asset, StoreError> {
        if self.fail_creates.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("disk full".to_string()));
        }
        self.inner.create(draft)
    }

    fn get(&self, id: &AssetId) -> Result<Option<Asset>, StoreError> {
        self.inner.get(id)
    }

    fn list_children(&self, parent_id: &AssetId) -> Result<Vec<Asset>, StoreError> {
        self.inner.list_children(parent_id)
    }

    fn list_by_seed(&self, seed: Seed) -> Result<Vec<Asset>, StoreError> {
        self.inner.list_by_seed(seed)
    }

    fn list_all(&self) -> Result<Vec<Asset>, StoreError> {
        self.inner.list_all()
    }

    fn record_file_metadata(
        &self,
        id: &AssetId,
        file: FileMetadata,
    ) -> Result<Asset, StoreError> {
        self.inner.record_file_metadata(id, file)
    }
}

pub fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

pub fn engine_with(
    provider: Arc<ScriptedProvider>,
    store: Arc<dyn AssetStore>,
) -> MatrixEngine {
    MatrixEngine::new(provider, store, EngineConfig::default()).unwrap()
}

/// Engine over a fresh in-memory store
pub fn engine(provider: Arc<ScriptedProvider>) -> (MatrixEngine, Arc<InMemoryAssetStore>) {
    let store = Arc::new(InMemoryAssetStore::new());
    (engine_with(provider, store.clone()), store)
}

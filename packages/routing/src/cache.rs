//! Lazily loaded, single-flight road graph cache.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::OnceCell;

use crate::RoutingError;
use crate::graph::RoadGraph;
use crate::network::IndexedRoadNetwork;

/// Source of road graphs, keyed by area.
#[async_trait]
pub trait GraphProvider: Send + Sync {
    /// Loads the graph for `area`.
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError`] if the area cannot be loaded.
    async fn load(&self, area: &str) -> Result<RoadGraph, RoutingError>;
}

/// Reads `<root>/<area>.json` graph files.
#[derive(Debug, Clone)]
pub struct JsonFileGraphProvider {
    root: PathBuf,
}

impl JsonFileGraphProvider {
    /// Creates a provider rooted at `root`.
    #[must_use]
    pub const fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

#[async_trait]
impl GraphProvider for JsonFileGraphProvider {
    async fn load(&self, area: &str) -> Result<RoadGraph, RoutingError> {
        if area.is_empty() || area.contains(['/', '\\']) || area.contains("..") {
            return Err(RoutingError::GraphLoad {
                area: area.to_string(),
                message: "invalid area key".to_string(),
            });
        }
        let path = self.root.join(format!("{area}.json"));
        let json = tokio::fs::read_to_string(&path).await?;
        RoadGraph::from_json(&json)
    }
}

type Cell = Arc<OnceCell<Arc<IndexedRoadNetwork>>>;

/// Loads each area at most once; concurrent callers share the load.
///
/// Each load is bounded by the cache's timeout. A failed or timed-out load
/// drops the area's entry so the next call retries and unknown areas do not
/// accumulate.
pub struct GraphCache {
    provider: Arc<dyn GraphProvider>,
    timeout: Duration,
    cells: Mutex<BTreeMap<String, Cell>>,
}

impl GraphCache {
    /// Creates an empty cache over `provider` whose loads give up after
    /// `timeout`.
    #[must_use]
    pub fn new(provider: Arc<dyn GraphProvider>, timeout: Duration) -> Self {
        Self {
            provider,
            timeout,
            cells: Mutex::new(BTreeMap::new()),
        }
    }

    fn cell(&self, area: &str) -> Cell {
        let mut cells = self.cells.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(cells.entry(area.to_string()).or_default())
    }

    fn evict_empty(&self, area: &str, cell: &Cell) {
        let mut cells = self.cells.lock().unwrap_or_else(PoisonError::into_inner);
        if !cell.initialized() && cells.get(area).is_some_and(|c| Arc::ptr_eq(c, cell)) {
            cells.remove(area);
        }
    }

    async fn load(&self, area: &str) -> Result<Arc<IndexedRoadNetwork>, RoutingError> {
        log::info!("Loading road graph for area '{area}'");
        let graph = tokio::time::timeout(self.timeout, self.provider.load(area))
            .await
            .map_err(|_| RoutingError::Timeout {
                area: area.to_string(),
                timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            })
            .and_then(|result| result)
            .inspect_err(|e| log::warn!("Road graph load for '{area}' failed: {e}"))?;
        Ok(Arc::new(IndexedRoadNetwork::new(Arc::new(graph))))
    }

    /// Returns the indexed network for `area`, loading it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError::Timeout`] if the provider does not answer
    /// in time, or the provider's own error.
    pub async fn get(&self, area: &str) -> Result<Arc<IndexedRoadNetwork>, RoutingError> {
        let cell = self.cell(area);
        match cell.get_or_try_init(|| self.load(area)).await {
            Ok(network) => Ok(Arc::clone(network)),
            Err(e) => {
                self.evict_empty(area, &cell);
                Err(e)
            }
        }
    }

    /// Number of areas with a load in flight or completed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether no area has been requested yet, or every request failed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the network for `area` only if it is already loaded.
    #[must_use]
    pub fn try_get(&self, area: &str) -> Option<Arc<IndexedRoadNetwork>> {
        let cells = self.cells.lock().unwrap_or_else(PoisonError::into_inner);
        cells.get(area)?.get().cloned()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::graph::tests::diamond;
    use crate::network::RoadNetwork;

    struct Counting {
        loads: AtomicUsize,
        fail_first: bool,
    }

    #[async_trait]
    impl GraphProvider for Counting {
        async fn load(&self, area: &str) -> Result<RoadGraph, RoutingError> {
            let n = self.loads.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            if self.fail_first && n == 0 {
                return Err(RoutingError::GraphLoad {
                    area: area.to_string(),
                    message: "transient".to_string(),
                });
            }
            Ok(diamond())
        }
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_load() {
        let provider = Arc::new(Counting {
            loads: AtomicUsize::new(0),
            fail_first: false,
        });
        let cache = Arc::new(GraphCache::new(provider.clone(), Duration::from_secs(5)));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            handles.push(tokio::spawn(async move { cache.get("guwahati").await }));
        }
        for handle in handles {
            let network = handle.await.unwrap().unwrap();
            assert_eq!(network.graph().node_count(), 4);
        }

        assert_eq!(provider.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn try_get_does_not_load() {
        let provider = Arc::new(Counting {
            loads: AtomicUsize::new(0),
            fail_first: false,
        });
        let cache = GraphCache::new(provider.clone(), Duration::from_secs(5));
        assert!(cache.try_get("guwahati").is_none());
        assert_eq!(provider.loads.load(Ordering::SeqCst), 0);

        cache.get("guwahati").await.unwrap();
        assert!(cache.try_get("guwahati").is_some());
        assert!(cache.try_get("shillong").is_none());
    }

    #[tokio::test]
    async fn failed_load_is_retried() {
        let provider = Arc::new(Counting {
            loads: AtomicUsize::new(0),
            fail_first: true,
        });
        let cache = GraphCache::new(provider.clone(), Duration::from_secs(5));
        assert!(cache.get("guwahati").await.is_err());
        assert!(cache.try_get("guwahati").is_none());
        assert!(cache.get("guwahati").await.is_ok());
        assert_eq!(provider.loads.load(Ordering::SeqCst), 2);
    }

    struct Hanging;

    #[async_trait]
    impl GraphProvider for Hanging {
        async fn load(&self, _area: &str) -> Result<RoadGraph, RoutingError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(diamond())
        }
    }

    #[tokio::test]
    async fn hanging_provider_times_out() {
        let cache = GraphCache::new(Arc::new(Hanging), Duration::from_millis(50));
        let result = tokio::time::timeout(Duration::from_secs(5), cache.get("guwahati"))
            .await
            .unwrap();
        assert!(matches!(
            result,
            Err(RoutingError::Timeout { timeout_ms: 50, .. })
        ));
        assert!(cache.try_get("guwahati").is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn failed_areas_do_not_accumulate() {
        let provider = Arc::new(Counting {
            loads: AtomicUsize::new(0),
            fail_first: true,
        });
        let cache = GraphCache::new(provider, Duration::from_secs(5));

        assert!(cache.get("nowhere").await.is_err());
        assert!(cache.is_empty());

        cache.get("guwahati").await.unwrap();
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn unknown_areas_are_not_retained() {
        let dir = std::env::temp_dir().join(format!("safe-route-empty-{}", std::process::id()));
        let cache = GraphCache::new(
            Arc::new(JsonFileGraphProvider::new(dir)),
            Duration::from_secs(5),
        );
        for i in 0..100 {
            assert!(cache.get(&format!("area-{i}")).await.is_err());
        }
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn json_provider_rejects_path_traversal() {
        let provider = JsonFileGraphProvider::new(PathBuf::from("/tmp"));
        assert!(matches!(
            provider.load("../etc/passwd").await,
            Err(RoutingError::GraphLoad { .. })
        ));
    }

    #[tokio::test]
    async fn json_provider_reads_files() {
        let dir = std::env::temp_dir().join(format!("safe-route-graphs-{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let json = r#"{
            "nodes": [
                {"id": 1, "point": {"lat": 26.1, "lng": 91.7}},
                {"id": 2, "point": {"lat": 26.2, "lng": 91.8}}
            ],
            "edges": [{"from": 1, "to": 2, "travelTime": 12.5}]
        }"#;
        tokio::fs::write(dir.join("test-area.json"), json).await.unwrap();

        let provider = JsonFileGraphProvider::new(dir.clone());
        let graph = provider.load("test-area").await.unwrap();
        assert_eq!(graph.node_count(), 2);
        assert!(matches!(provider.load("missing").await, Err(RoutingError::Io(_))));

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}

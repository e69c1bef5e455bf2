//! # Asset Loading
//!
//! Fetches and decodes template images. Loads are tokio tasks: start one
//! with [`AssetLoader::spawn`], then await it or cancel it through the
//! returned [`PendingLoad`]. Either way the result is a [`LoadOutcome`];
//! a failed load is a value, never a panic.
//!
//! ## Sources
//!
//! | Path | Fetched from |
//! |------|--------------|
//! | `http://…`, `https://…` | that URL |
//! | relative, root is a URL | `root/path` over HTTP |
//! | relative, root is a directory | `root/path` on disk |
//!
//! Every HTTP request carries a fresh `timestamp=<unix millis>` query
//! parameter so intermediaries never serve a stale template.

use async_trait::async_trait;
use image::DynamicImage;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::task::JoinHandle;

use crate::error::TicketError;

/// Result of one template load.
#[derive(Debug, Clone)]
pub enum LoadOutcome {
    Loaded(Arc<DynamicImage>),
    Failed(String),
}

impl LoadOutcome {
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }
}

// ============================================================================
// CACHE BUSTING
// ============================================================================

static LAST_STAMP: AtomicI64 = AtomicI64::new(0);

/// Wall-clock milliseconds, strictly increasing within this process.
pub fn next_timestamp() -> i64 {
    let now = chrono::Utc::now().timestamp_millis();
    let mut last = LAST_STAMP.load(Ordering::Relaxed);
    loop {
        let stamp = now.max(last + 1);
        match LAST_STAMP.compare_exchange_weak(last, stamp, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return stamp,
            Err(actual) => last = actual,
        }
    }
}

/// Append `timestamp=<stamp>` to `url`, keeping any fragment last.
pub fn cache_bust(url: &str, stamp: i64) -> String {
    let (base, fragment) = match url.split_once('#') {
        Some((base, fragment)) => (base, Some(fragment)),
        None => (url, None),
    };
    let separator = if base.contains('?') { '&' } else { '?' };
    let mut busted = format!("{}{}timestamp={}", base, separator, stamp);
    if let Some(fragment) = fragment {
        busted.push('#');
        busted.push_str(fragment);
    }
    busted
}

fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

// ============================================================================
// FETCHERS
// ============================================================================

/// Raw byte source for template images.
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, TicketError>;
}

/// Where relative asset paths resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetRoot {
    Dir(PathBuf),
    Url(String),
}

impl AssetRoot {
    pub fn parse(root: &str) -> Self {
        if is_url(root) {
            Self::Url(root.trim_end_matches('/').to_string())
        } else {
            Self::Dir(PathBuf::from(root))
        }
    }
}

/// Disk and HTTP fetcher used outside of tests.
pub struct StandardFetcher {
    root: AssetRoot,
    http_client: reqwest::Client,
}

impl StandardFetcher {
    pub fn new(root: AssetRoot) -> Result<Self, TicketError> {
        let http_client = reqwest::Client::builder()
            .user_agent("ticket-stamp/0.1")
            .build()
            .map_err(|e| TicketError::AssetLoad(format!("HTTP client error: {}", e)))?;
        Ok(Self { root, http_client })
    }

    async fn fetch_url(&self, url: &str) -> Result<Vec<u8>, TicketError> {
        let url = cache_bust(url, next_timestamp());
        tracing::debug!(%url, "fetching template");

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| TicketError::AssetLoad(format!("Failed to download {}: {}", url, e)))?;
        if !response.status().is_success() {
            return Err(TicketError::AssetLoad(format!(
                "Failed to download {}: HTTP {}",
                url,
                response.status()
            )));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| TicketError::AssetLoad(format!("Failed to read {}: {}", url, e)))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl AssetFetcher for StandardFetcher {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, TicketError> {
        if is_url(path) {
            return self.fetch_url(path).await;
        }
        match &self.root {
            AssetRoot::Url(base) => {
                let url = format!("{}/{}", base, path.trim_start_matches('/'));
                self.fetch_url(&url).await
            }
            AssetRoot::Dir(dir) => {
                let file = dir.join(path);
                tokio::fs::read(&file).await.map_err(|e| {
                    TicketError::AssetLoad(format!("Failed to read {}: {}", file.display(), e))
                })
            }
        }
    }
}

// ============================================================================
// LOADER
// ============================================================================

/// Fetch + decode front end, cheap to clone.
#[derive(Clone)]
pub struct AssetLoader {
    fetcher: Arc<dyn AssetFetcher>,
}

impl AssetLoader {
    /// Loader resolving relative paths against `root` (directory or URL).
    pub fn from_root(root: &str) -> Result<Self, TicketError> {
        Ok(Self::with_fetcher(Arc::new(StandardFetcher::new(
            AssetRoot::parse(root),
        )?)))
    }

    pub fn with_fetcher(fetcher: Arc<dyn AssetFetcher>) -> Self {
        Self { fetcher }
    }

    /// Fetch and decode one template.
    pub async fn load(&self, path: &str) -> LoadOutcome {
        let result = match self.fetcher.fetch(path).await {
            Ok(bytes) => tokio::task::spawn_blocking(move || image::load_from_memory(&bytes))
                .await
                .map_err(|e| format!("Decode task failed: {}", e))
                .and_then(|decoded| decoded.map_err(|e| format!("Failed to decode image: {}", e))),
            Err(e) => Err(e.to_string()),
        };

        match result {
            Ok(image) => {
                tracing::info!(path, width = image.width(), height = image.height(), "template loaded");
                LoadOutcome::Loaded(Arc::new(image))
            }
            Err(reason) => {
                tracing::error!(path, %reason, "template load failed");
                LoadOutcome::Failed(reason)
            }
        }
    }

    /// Start loading `path` in the background.
    pub fn spawn(&self, path: &str) -> PendingLoad {
        let loader = self.clone();
        let owned = path.to_string();
        let handle = tokio::spawn(async move { loader.load(&owned).await });
        PendingLoad {
            path: path.to_string(),
            handle,
        }
    }
}

/// A template load in flight. Dropping it aborts the load.
#[derive(Debug)]
pub struct PendingLoad {
    path: String,
    handle: JoinHandle<LoadOutcome>,
}

impl PendingLoad {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Abort the load; its outcome will never be observed.
    pub fn cancel(self) {
        tracing::debug!(path = %self.path, "template load cancelled");
        self.handle.abort();
    }

    /// Wait for the outcome. `None` if the task was aborted or panicked.
    pub async fn wait(mut self) -> Option<LoadOutcome> {
        match (&mut self.handle).await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                if !e.is_cancelled() {
                    tracing::error!(path = %self.path, error = %e, "template load task failed");
                }
                None
            }
        }
    }
}

impl Drop for PendingLoad {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Fetchers for exercising load timing and failure.

    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;
    use std::sync::atomic::AtomicBool;
    use std::time::Duration;
    use tokio::sync::Notify;

    pub fn png_bytes(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
        let image = RgbaImage::from_pixel(width, height, Rgba(rgba));
        let mut bytes = Cursor::new(Vec::new());
        image.write_to(&mut bytes, ImageFormat::Png).unwrap();
        bytes.into_inner()
    }

    /// Serves a fixed PNG after an optional gate opens. `served` flips once
    /// the gate has been passed.
    pub struct StaticFetcher {
        pub bytes: Vec<u8>,
        pub gate: Option<Arc<Notify>>,
        pub delay: Duration,
        pub served: Arc<AtomicBool>,
    }

    impl StaticFetcher {
        pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
            Self::gated(png_bytes(width, height, rgba), None)
        }

        pub fn gated(bytes: Vec<u8>, gate: Option<Arc<Notify>>) -> Self {
            Self {
                bytes,
                gate,
                delay: Duration::ZERO,
                served: Arc::new(AtomicBool::new(false)),
            }
        }
    }

    #[async_trait]
    impl AssetFetcher for StaticFetcher {
        async fn fetch(&self, _path: &str) -> Result<Vec<u8>, TicketError> {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.served.store(true, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            Ok(self.bytes.clone())
        }
    }

    /// Panics instead of answering, so the load task dies without a result.
    pub struct PanickingFetcher;

    #[async_trait]
    impl AssetFetcher for PanickingFetcher {
        async fn fetch(&self, path: &str) -> Result<Vec<u8>, TicketError> {
            panic!("fetcher blew up on {}", path);
        }
    }

    pub struct FailingFetcher;

    #[async_trait]
    impl AssetFetcher for FailingFetcher {
        async fn fetch(&self, path: &str) -> Result<Vec<u8>, TicketError> {
            Err(TicketError::AssetLoad(format!("Failed to read {}: not found", path)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    #[test]
    fn test_cache_bust_separator() {
        assert_eq!(
            cache_bust("images/template-bg.png", 42),
            "images/template-bg.png?timestamp=42"
        );
        assert_eq!(
            cache_bust("https://cdn.example.com/bg.png?v=2", 7),
            "https://cdn.example.com/bg.png?v=2&timestamp=7"
        );
        assert_eq!(
            cache_bust("https://cdn.example.com/bg.png#top", 7),
            "https://cdn.example.com/bg.png?timestamp=7#top"
        );
    }

    #[test]
    fn test_timestamps_increase() {
        let a = next_timestamp();
        let b = next_timestamp();
        let c = next_timestamp();
        assert!(a < b && b < c);
    }

    #[test]
    fn test_asset_root_parse() {
        assert_eq!(
            AssetRoot::parse("https://static.example.com/tickets/"),
            AssetRoot::Url("https://static.example.com/tickets".into())
        );
        assert_eq!(AssetRoot::parse("public"), AssetRoot::Dir(PathBuf::from("public")));
    }

    #[tokio::test]
    async fn test_load_from_directory() {
        let dir = std::env::temp_dir().join(format!("ticket-stamp-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(dir.join("images")).unwrap();
        std::fs::write(dir.join("images/bg.png"), png_bytes(14, 9, [9, 9, 9, 255])).unwrap();

        let loader = AssetLoader::from_root(dir.to_str().unwrap()).unwrap();
        let outcome = loader.load("images/bg.png").await;
        match outcome {
            LoadOutcome::Loaded(image) => assert_eq!((image.width(), image.height()), (14, 9)),
            LoadOutcome::Failed(reason) => panic!("load failed: {}", reason),
        }

        let missing = loader.load("images/nope.png").await;
        assert!(matches!(missing, LoadOutcome::Failed(ref r) if r.contains("nope.png")));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_undecodable_bytes_fail() {
        let loader = AssetLoader::with_fetcher(Arc::new(StaticFetcher::gated(
            b"definitely not a png".to_vec(),
            None,
        )));
        assert!(matches!(loader.load("bg.png").await, LoadOutcome::Failed(_)));
    }

    #[tokio::test]
    async fn test_spawned_load_resolves() {
        let loader = AssetLoader::with_fetcher(Arc::new(StaticFetcher::solid(3, 2, [1, 1, 1, 255])));
        let pending = loader.spawn("bg.png");
        assert_eq!(pending.path(), "bg.png");
        let outcome = pending.wait().await.expect("not cancelled");
        assert!(outcome.is_loaded());
    }

    #[tokio::test]
    async fn test_cancel_pending_load() {
        let gate = Arc::new(tokio::sync::Notify::new());
        let fetcher = StaticFetcher::gated(png_bytes(2, 2, [0, 0, 0, 255]), Some(gate.clone()));
        let served = fetcher.served.clone();
        let loader = AssetLoader::with_fetcher(Arc::new(fetcher));

        let pending = loader.spawn("bg.png");
        assert!(!pending.is_finished());
        pending.cancel();

        // notify_one stores a permit, so a live task would get through
        gate.notify_one();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!served.load(Ordering::SeqCst), "cancelled load must not run on");
    }

    #[tokio::test]
    async fn test_dropped_pending_load_is_aborted() {
        let gate = Arc::new(tokio::sync::Notify::new());
        let fetcher = StaticFetcher::gated(png_bytes(2, 2, [0, 0, 0, 255]), Some(gate.clone()));
        let served = fetcher.served.clone();
        let loader = AssetLoader::with_fetcher(Arc::new(fetcher));

        drop(loader.spawn("bg.png"));
        gate.notify_one();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!served.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_gated_load_completes_when_opened() {
        let gate = Arc::new(tokio::sync::Notify::new());
        let fetcher = StaticFetcher::gated(png_bytes(2, 2, [0, 0, 0, 255]), Some(gate.clone()));
        let served = fetcher.served.clone();
        let loader = AssetLoader::with_fetcher(Arc::new(fetcher));

        let pending = loader.spawn("bg.png");
        gate.notify_one();
        assert!(pending.wait().await.unwrap().is_loaded());
        assert!(served.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_panicking_load_has_no_outcome() {
        let loader = AssetLoader::with_fetcher(Arc::new(PanickingFetcher));
        assert!(loader.spawn("bg.png").wait().await.is_none());
    }

    // ------------------------------------------------------------------
    // HTTP
    // ------------------------------------------------------------------

    /// Serve `/images/bg.png` on a local port, recording each query string.
    async fn template_server() -> (String, Arc<std::sync::Mutex<Vec<String>>>) {
        use axum::{Router, extract::RawQuery, http::header, routing::get};

        let queries = Arc::new(std::sync::Mutex::new(Vec::new()));
        let recorded = queries.clone();
        let app = Router::new().route(
            "/images/bg.png",
            get(move |RawQuery(query): RawQuery| {
                let recorded = recorded.clone();
                async move {
                    recorded.lock().unwrap().push(query.unwrap_or_default());
                    ([(header::CONTENT_TYPE, "image/png")], png_bytes(6, 4, [5, 6, 7, 255]))
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}", addr), queries)
    }

    #[tokio::test]
    async fn test_http_root_fetch_is_cache_busted() {
        let (base, queries) = template_server().await;
        let loader = AssetLoader::from_root(&format!("{}/", base)).unwrap();

        match loader.load("images/bg.png").await {
            LoadOutcome::Loaded(image) => assert_eq!((image.width(), image.height()), (6, 4)),
            LoadOutcome::Failed(reason) => panic!("load failed: {}", reason),
        }
        loader.load("/images/bg.png").await;

        let queries = queries.lock().unwrap().clone();
        assert_eq!(queries.len(), 2);
        for query in &queries {
            let stamp = query.strip_prefix("timestamp=").expect("timestamp parameter");
            assert!(stamp.parse::<i64>().is_ok(), "stamp {}", stamp);
        }
        assert!(queries[0] != queries[1], "every request gets a fresh stamp");
    }

    #[tokio::test]
    async fn test_http_absolute_url_keeps_query() {
        let (base, queries) = template_server().await;
        let loader = AssetLoader::from_root("unused-dir").unwrap();

        let outcome = loader.load(&format!("{}/images/bg.png?v=2", base)).await;
        assert!(outcome.is_loaded());
        let query = queries.lock().unwrap()[0].clone();
        assert!(query.starts_with("v=2&timestamp="), "query {}", query);
    }

    #[tokio::test]
    async fn test_http_not_found_fails() {
        let (base, _) = template_server().await;
        let loader = AssetLoader::from_root(&base).unwrap();

        match loader.load("images/missing.png").await {
            LoadOutcome::Failed(reason) => assert!(reason.contains("404"), "reason {}", reason),
            LoadOutcome::Loaded(_) => panic!("missing template must not load"),
        }
    }

    #[tokio::test]
    async fn test_failing_fetcher() {
        let loader = AssetLoader::with_fetcher(Arc::new(FailingFetcher));
        let outcome = loader.spawn("images/template-bg.png").wait().await.unwrap();
        assert!(matches!(outcome, LoadOutcome::Failed(ref r) if r.contains("template-bg.png")));
    }
}

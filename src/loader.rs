//! Fetching dataset text and turning it into a [`Table`].

use crate::error::{FetchError, LoadError};
use crate::locator::{decode_component, DatasetLocator};
use crate::store::ColumnId;
use crate::table::Table;
use std::collections::HashMap;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Reads the text of a resource path such as `data/a/b/c/file.csv`.
pub trait Fetcher: Send + Sync + 'static {
    fn fetch(&self, path: &str) -> impl Future<Output = Result<String, FetchError>> + Send;
}

/// Reads resources from a local directory that contains the `data/` tree.
#[derive(Debug, Clone)]
pub struct DirFetcher {
    root: PathBuf,
}

impl DirFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Decode each path component; reject anything that would leave the root.
    fn resolve(&self, path: &str) -> Result<PathBuf, FetchError> {
        let mut full = self.root.clone();
        for component in path.split('/') {
            let decoded = decode_component(component);
            if decoded.is_empty()
                || decoded == "."
                || decoded == ".."
                || decoded.contains('/')
                || decoded.contains('\\')
            {
                return Err(FetchError::InvalidPath(path.to_string()));
            }
            full.push(decoded);
        }
        Ok(full)
    }
}

impl Fetcher for DirFetcher {
    async fn fetch(&self, path: &str) -> Result<String, FetchError> {
        let full = self.resolve(path)?;
        match tokio::fs::read_to_string(&full).await {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(FetchError::Status(404)),
            Err(e) => Err(FetchError::Io(e)),
        }
    }
}

/// Reads resources over HTTP(S) relative to a base URL.
#[cfg(feature = "http")]
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    base_url: String,
}

#[cfg(feature = "http")]
impl HttpFetcher {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[cfg(feature = "http")]
fn fetch_blocking(url: &str) -> Result<String, FetchError> {
    match ureq::get(url).call() {
        Ok(response) => response.into_string().map_err(FetchError::Io),
        Err(ureq::Error::Status(code, _)) => Err(FetchError::Status(code)),
        Err(ureq::Error::Transport(transport)) => Err(FetchError::Transport(transport.to_string())),
    }
}

#[cfg(feature = "http")]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, path: &str) -> Result<String, FetchError> {
        let url = self.url_for(path);
        tokio::task::spawn_blocking(move || fetch_blocking(&url))
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?
    }
}

/// In-memory resources keyed by resource path. Missing paths answer 404.
#[derive(Debug, Clone, Default)]
pub struct MemoryFetcher {
    files: HashMap<String, String>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, locator: &DatasetLocator, text: impl Into<String>) {
        self.files.insert(locator.resource_path(), text.into());
    }

    pub fn with(mut self, locator: &DatasetLocator, text: impl Into<String>) -> Self {
        self.insert(locator, text);
        self
    }
}

impl Fetcher for MemoryFetcher {
    async fn fetch(&self, path: &str) -> Result<String, FetchError> {
        self.files
            .get(path)
            .cloned()
            .ok_or(FetchError::Status(404))
    }
}

/// Either fetcher, picked from the configured data root.
#[derive(Debug, Clone)]
pub enum AnyFetcher {
    Dir(DirFetcher),
    #[cfg(feature = "http")]
    Http(HttpFetcher),
}

impl Fetcher for AnyFetcher {
    async fn fetch(&self, path: &str) -> Result<String, FetchError> {
        match self {
            Self::Dir(f) => f.fetch(path).await,
            #[cfg(feature = "http")]
            Self::Http(f) => f.fetch(path).await,
        }
    }
}

/// HTTP for `http://` and `https://` roots, a local directory otherwise.
pub fn fetcher_for_root(root: &str) -> AnyFetcher {
    let lower = root.to_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        #[cfg(feature = "http")]
        return AnyFetcher::Http(HttpFetcher::new(root));
        #[cfg(not(feature = "http"))]
        warn!(%root, "built without http support; treating data root as a directory");
    }
    AnyFetcher::Dir(DirFetcher::new(root))
}

/// Fetch and parse one dataset. Never retries.
pub async fn load<F: Fetcher + ?Sized>(
    fetcher: &F,
    locator: &DatasetLocator,
) -> Result<Table, LoadError> {
    let path = locator.resource_path();
    debug!(%path, "fetching dataset");
    match fetcher.fetch(&path).await {
        Ok(text) => Ok(Table::parse(&text)),
        Err(cause) => {
            warn!(%path, error = %cause, "dataset load failed");
            Err(LoadError {
                locator: locator.clone(),
                path,
                cause,
            })
        }
    }
}

/// A column is waiting for this locator to load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub column: ColumnId,
    pub locator: DatasetLocator,
    /// Keep the column's current sort instead of the default value-descending sort.
    pub preserve_sort: bool,
}

impl LoadRequest {
    pub async fn run<F: Fetcher + ?Sized>(self, fetcher: &F) -> LoadOutcome {
        let result = load(fetcher, &self.locator).await;
        LoadOutcome {
            request: self,
            result,
        }
    }
}

#[derive(Debug)]
pub struct LoadOutcome {
    pub request: LoadRequest,
    pub result: Result<Table, LoadError>,
}

/// Run every request concurrently and return once all of them have resolved.
pub async fn load_all<F: Fetcher>(fetcher: Arc<F>, requests: Vec<LoadRequest>) -> Vec<LoadOutcome> {
    let mut tasks = JoinSet::new();
    for request in requests {
        let fetcher = Arc::clone(&fetcher);
        tasks.spawn(async move { request.run(fetcher.as_ref()).await });
    }
    let mut outcomes = Vec::with_capacity(tasks.len());
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => warn!(error = %e, "load task did not complete"),
        }
    }
    outcomes
}

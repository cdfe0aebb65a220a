//! Fetch-once engine with callback fan-out.
//!
//! For a given [`AssetIdentity`] the engine either serves the cached file or
//! downloads it, and at most one download per cache key runs at a time.
//! Requests arriving while a download is outstanding join its sink list.
//!
//! # Delivery
//!
//! Every notification, cache hits included, is delivered from a task spawned
//! on the engine's Tokio runtime. [`FetchEngine::request`] never invokes a
//! sink itself, so a sink may call `request` again from inside a callback.
//! A transport or decoder that panics surfaces as [`FetchError::Aborted`];
//! the in-flight record is cleared either way.
//!
//! # Purge races
//!
//! [`FetchEngine::remove_all`] neither cancels nor waits for downloads in
//! flight. A download finishing during or after a purge leaves its freshly
//! written file behind; callers relying on either ordering must serialize
//! purges with their own requests.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::Result;
use image::DynamicImage;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use super::error::{FetchError, StorageError};
use super::sink::NotificationSink;
use crate::adapters::{Decoder, HttpTransport, ImageDecoder, Transport};
use crate::config::ResolvedConfig;
use crate::domain::AssetIdentity;
use crate::store::AssetStore;

/// Shared handle to a registered sink
pub type SharedSink = Arc<dyn NotificationSink>;

/// Sinks waiting on one outstanding download
struct InFlightRequest {
    /// Notified in registration order
    sinks: Vec<SharedSink>,
}

/// State shared between the engine handle and its download tasks
struct EngineState {
    store: AssetStore,
    transport: Arc<dyn Transport>,
    decoder: Arc<dyn Decoder>,

    /// Cache key -> outstanding download. Also held across the cache
    /// existence check so check-then-register is atomic.
    in_flight: Mutex<HashMap<String, InFlightRequest>>,
}

impl EngineState {
    fn lock_in_flight(&self) -> MutexGuard<'_, HashMap<String, InFlightRequest>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Image fetch/cache/dispatch engine.
///
/// Cheap to clone; clones share the same in-flight bookkeeping.
#[derive(Clone)]
pub struct FetchEngine {
    state: Arc<EngineState>,
    runtime: Handle,
}

impl FetchEngine {
    /// Create an engine from explicit collaborators
    pub fn new(
        store: AssetStore,
        transport: Arc<dyn Transport>,
        decoder: Arc<dyn Decoder>,
        runtime: Handle,
    ) -> Self {
        Self {
            state: Arc::new(EngineState {
                store,
                transport,
                decoder,
                in_flight: Mutex::new(HashMap::new()),
            }),
            runtime,
        }
    }

    /// Create an engine with the HTTP transport and image decoder
    pub fn from_config(config: &ResolvedConfig, runtime: Handle) -> Result<Self> {
        let transport = HttpTransport::from_config(config)?;

        Ok(Self::new(
            AssetStore::from_config(config),
            Arc::new(transport),
            Arc::new(ImageDecoder),
            runtime,
        ))
    }

    /// The backing store
    pub fn store(&self) -> &AssetStore {
        &self.state.store
    }

    /// Local path the asset is (or would be) cached at
    pub fn cached_path(&self, identity: &AssetIdentity) -> PathBuf {
        self.state.store.path_for(&identity.file_name())
    }

    /// Number of downloads currently outstanding
    pub fn in_flight_count(&self) -> usize {
        self.state.lock_in_flight().len()
    }

    /// Whether a download for this identity's cache key is outstanding
    pub fn is_in_flight(&self, identity: &AssetIdentity) -> bool {
        self.state
            .lock_in_flight()
            .contains_key(&identity.file_name())
    }

    /// Request an asset; `sink` is notified exactly once.
    ///
    /// Serves the cached file if present, otherwise joins the outstanding
    /// download for the same cache key or starts a new one.
    pub fn request(&self, identity: AssetIdentity, sink: SharedSink) {
        let file_name = identity.file_name();

        let mut in_flight = self.state.lock_in_flight();

        if self.state.store.exists(&file_name) {
            drop(in_flight);
            debug!(file_name = %file_name, "Cache hit");

            let engine = self.clone();
            self.runtime.spawn(async move {
                engine.serve_cached(identity, file_name, sink).await;
            });
            return;
        }

        if let Some(pending) = in_flight.get_mut(&file_name) {
            pending.sinks.push(sink);
            debug!(
                file_name = %file_name,
                sinks = pending.sinks.len(),
                "Joined in-flight fetch"
            );
            return;
        }

        in_flight.insert(file_name.clone(), InFlightRequest { sinks: vec![sink] });
        drop(in_flight);

        info!(url = identity.remote_url(), file_name = %file_name, "Fetching");

        let engine = self.clone();
        self.runtime.spawn(async move {
            engine.fetch_and_dispatch(identity, file_name).await;
        });
    }

    /// Remove every cached asset.
    ///
    /// Does not touch downloads in flight; see the module docs for the race.
    pub async fn remove_all(&self) -> Result<usize, StorageError> {
        let removed = self.state.store.purge_all().await?;
        info!(removed, "Removed all cached images");
        Ok(removed)
    }

    /// Read and decode a cached file for a single sink
    async fn serve_cached(&self, identity: AssetIdentity, file_name: String, sink: SharedSink) {
        let bytes = match self.state.store.read(&file_name).await {
            Ok(bytes) => bytes,
            Err(StorageError::Read { source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                // Purged between the existence check and the read
                debug!(file_name = %file_name, "Cached file vanished, refetching");
                self.request(identity, sink);
                return;
            }
            Err(e) => {
                sink.on_failure(&FetchError::from(e), &identity);
                return;
            }
        };

        // Off the async workers; a panicking decoder surfaces as a JoinError
        let decoder = Arc::clone(&self.state.decoder);
        let decoded = tokio::task::spawn_blocking(move || decoder.decode(&bytes))
            .await
            .map_err(|e| FetchError::Aborted(e.to_string()))
            .and_then(|result| result.map_err(FetchError::from));

        match decoded {
            Ok(image) => sink.on_success(Arc::new(image), &identity),
            Err(e) => {
                warn!(file_name = %file_name, error = %e, "Cached image failed to decode");
                sink.on_failure(&e, &identity);
            }
        }
    }

    /// Download, store and decode, then notify every waiting sink
    async fn fetch_and_dispatch(&self, identity: AssetIdentity, file_name: String) {
        // Run the fetch in its own task so a panicking transport or decoder
        // still reaches the cleanup and fan-out below
        let engine = self.clone();
        let task_identity = identity.clone();
        let task_file_name = file_name.clone();
        let outcome = self
            .runtime
            .spawn(async move {
                engine
                    .fetch_and_store(&task_identity, &task_file_name)
                    .await
            })
            .await
            .unwrap_or_else(|e| Err(FetchError::Aborted(e.to_string())));

        // Drop the record before fan-out so callbacks see no stale entry
        let sinks = self
            .state
            .lock_in_flight()
            .remove(&file_name)
            .map(|pending| pending.sinks)
            .unwrap_or_default();

        match outcome {
            Ok(image) => {
                info!(file_name = %file_name, sinks = sinks.len(), "Fetched");
                for sink in &sinks {
                    sink.on_success(Arc::clone(&image), &identity);
                }
            }
            Err(e) => {
                warn!(
                    url = identity.remote_url(),
                    file_name = %file_name,
                    sinks = sinks.len(),
                    error = %e,
                    "Fetch failed"
                );
                for sink in &sinks {
                    sink.on_failure(&e, &identity);
                }
            }
        }
    }

    async fn fetch_and_store(
        &self,
        identity: &AssetIdentity,
        file_name: &str,
    ) -> Result<Arc<DynamicImage>, FetchError> {
        let url = identity.remote_url();

        let bytes = self
            .state
            .transport
            .fetch(url)
            .await
            .map_err(|source| FetchError::Network {
                url: url.to_string(),
                source,
            })?;

        // A write failure fails the whole request, even when the bytes decode
        let decoded = self.state.decoder.decode(&bytes);
        self.state.store.write(file_name, bytes).await?;

        Ok(Arc::new(decoded?))
    }
}

impl std::fmt::Debug for FetchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchEngine")
            .field("root", &self.state.store.root())
            .field("transport", &self.state.transport.name())
            .finish_non_exhaustive()
    }
}

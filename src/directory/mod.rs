//! Cached pop directory.
//!
//! Lookups are served from an in-memory map. A miss triggers a refresh of the
//! whole list, and concurrent misses share one in-flight refresh: at most one
//! `/pops` request runs per directory at any time.

mod record;

use std::{collections::HashMap, sync::Arc};

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};

pub use record::PopRecord;

use crate::{backend::PopSource, DirectoryError};

type PopMap = HashMap<String, PopRecord>;
type Refresh = Shared<BoxFuture<'static, Result<Arc<PopMap>, DirectoryError>>>;

#[derive(Clone)]
pub struct PopDirectory {
    inner: Arc<Inner>,
}

struct Inner {
    source: Arc<dyn PopSource>,
    pops: RwLock<Arc<PopMap>>,
    inflight: Mutex<Option<Refresh>>,
}

impl PopDirectory {
    /// Builds the directory and loads the initial pop list.
    pub async fn connect(source: Arc<dyn PopSource>) -> Result<Self, DirectoryError> {
        let directory = Self {
            inner: Arc::new(Inner {
                source,
                pops: RwLock::new(Arc::new(PopMap::new())),
                inflight: Mutex::new(None),
            }),
        };

        directory.refresh().await?;

        Ok(directory)
    }

    /// Pop by id, refreshing the directory on a miss.
    #[instrument(skip(self))]
    pub async fn get(&self, pop_id: &str) -> Result<PopRecord, DirectoryError> {
        if let Some(pop) = self.cached(pop_id) {
            return Ok(pop);
        }

        debug!("Pop {} not cached, refreshing directory", pop_id);
        let pops = self.refresh().await?;

        pops.get(pop_id)
            .cloned()
            .ok_or_else(|| DirectoryError::not_found(pop_id))
    }

    /// Freshly fetched pop list, sorted by id.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<PopRecord>, DirectoryError> {
        let pops = self.refresh().await?;
        Ok(sorted(&pops))
    }

    /// Cached pop list, sorted by id. Never touches the network.
    pub fn snapshot(&self) -> Vec<PopRecord> {
        let pops = Arc::clone(&self.inner.pops.read());
        sorted(&pops)
    }

    pub fn len(&self) -> usize {
        self.inner.pops.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn cached(&self, pop_id: &str) -> Option<PopRecord> {
        self.inner.pops.read().get(pop_id).cloned()
    }

    /// Joins the in-flight refresh, or starts one if none is running
    async fn refresh(&self) -> Result<Arc<PopMap>, DirectoryError> {
        let refresh = {
            let mut slot = self.inner.inflight.lock();
            match slot.as_ref() {
                Some(refresh) => {
                    debug!("Joining in-flight pop refresh");
                    refresh.clone()
                }
                None => {
                    let refresh = self.spawn_refresh();
                    *slot = Some(refresh.clone());
                    refresh
                }
            }
        };

        refresh.await
    }

    /// Starts a refresh task that runs to completion even if every waiter
    /// goes away. The task clears the in-flight slot itself; a task that
    /// dies before doing so is cleared by whoever observes its failure.
    fn spawn_refresh(&self) -> Refresh {
        let task = tokio::spawn(Arc::clone(&self.inner).fetch());
        let inner = Arc::clone(&self.inner);

        task.map(move |joined| {
            joined.unwrap_or_else(|e| {
                inner.inflight.lock().take();
                warn!("Pop refresh task did not finish: {}", e);
                Err(DirectoryError::refresh_aborted(e.to_string()))
            })
        })
        .boxed()
        .shared()
    }
}

impl Inner {
    async fn fetch(self: Arc<Self>) -> Result<Arc<PopMap>, DirectoryError> {
        let outcome = match self.source.fetch_pops().await {
            Ok(records) => {
                let pops: Arc<PopMap> = Arc::new(
                    records
                        .into_iter()
                        .map(|pop| (pop.id.clone(), pop))
                        .collect(),
                );
                *self.pops.write() = Arc::clone(&pops);
                info!("Pop directory refreshed with {} pops", pops.len());
                Ok(pops)
            }
            Err(e) => {
                warn!("Pop directory refresh failed, keeping previous list: {}", e);
                Err(DirectoryError::from(e))
            }
        };

        self.inflight.lock().take();

        outcome
    }
}

fn sorted(pops: &PopMap) -> Vec<PopRecord> {
    let mut records: Vec<PopRecord> = pops.values().cloned().collect();
    records.sort_by(|a, b| a.id.cmp(&b.id));
    records
}

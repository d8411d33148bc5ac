//! Process-wide schema cache with single-flight resolution.

use super::client::SchemaClient;
use crate::schema::{KindSchema, ResourceKind};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

/// ResolveError reports why no schema could be produced for a kind.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolveError {
    #[error("schema for {kind} unavailable: {reason}")]
    Unavailable { kind: ResourceKind, reason: String },

    #[error("schema for {kind} unavailable: deadline exceeded")]
    DeadlineExceeded { kind: ResourceKind },
}

impl ResolveError {
    pub fn kind(&self) -> &ResourceKind {
        match self {
            ResolveError::Unavailable { kind, .. } | ResolveError::DeadlineExceeded { kind } => kind,
        }
    }
}

type Slot = Arc<OnceCell<Arc<KindSchema>>>;

/// SchemaResolver caches one schema per kind for the life of the process.
///
/// Concurrent calls for a kind that is not cached yet share a single fetch
/// from the client. A failed fetch leaves the slot empty, so the next caller
/// tries again.
pub struct SchemaResolver<C> {
    client: C,
    cache: Mutex<HashMap<ResourceKind, Slot>>,
}

impl<C: SchemaClient> SchemaResolver<C> {
    pub fn new(client: C) -> Self {
        SchemaResolver {
            client,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Returns the schema of `kind`, fetching it on first use.
    pub async fn resolve(&self, kind: &ResourceKind) -> Result<Arc<KindSchema>, ResolveError> {
        let slot = self.slot(kind);
        if let Some(schema) = slot.get() {
            debug!(%kind, "schema cache hit");
            return Ok(schema.clone());
        }

        slot.get_or_try_init(|| async {
            debug!(%kind, "schema cache miss, fetching");
            match self.client.fetch(kind).await {
                Ok(schema) => Ok(Arc::new(schema)),
                Err(err) => {
                    warn!(%kind, error = %err, "schema fetch failed");
                    Err(ResolveError::Unavailable {
                        kind: kind.clone(),
                        reason: err.to_string(),
                    })
                }
            }
        })
        .await
        .cloned()
    }

    /// Like [`resolve`](Self::resolve), but gives up after `timeout`. The
    /// pending fetch is dropped; other waiters on the same kind keep theirs.
    pub async fn resolve_within(
        &self,
        kind: &ResourceKind,
        timeout: Duration,
    ) -> Result<Arc<KindSchema>, ResolveError> {
        match tokio::time::timeout(timeout, self.resolve(kind)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(%kind, ?timeout, "schema resolution timed out");
                Err(ResolveError::DeadlineExceeded { kind: kind.clone() })
            }
        }
    }

    /// Drops the cached schema of `kind` so the next call fetches it again.
    /// Returns true if an entry was present.
    pub fn invalidate(&self, kind: &ResourceKind) -> bool {
        let removed = self.lock().remove(kind).is_some();
        if removed {
            debug!(%kind, "schema cache entry invalidated");
        }
        removed
    }

    /// Kinds whose schema is currently cached, in sorted order.
    pub fn cached_kinds(&self) -> Vec<ResourceKind> {
        let mut kinds: Vec<_> = self
            .lock()
            .iter()
            .filter(|(_, slot)| slot.initialized())
            .map(|(kind, _)| kind.clone())
            .collect();
        kinds.sort();
        kinds
    }

    fn slot(&self, kind: &ResourceKind) -> Slot {
        self.lock().entry(kind.clone()).or_default().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<ResourceKind, Slot>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

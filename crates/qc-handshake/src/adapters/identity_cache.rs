//! In-memory identity cache in front of a network fetcher.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use crate::domain::{CacheError, IdUrl, IdentityDocument};
use crate::ports::IdentityCache;

/// Downloads a peer's published identity document.
#[async_trait]
pub trait IdentityFetcher: Send + Sync {
    /// Fetch the document published at `idurl`.
    async fn fetch(&self, idurl: &IdUrl) -> Result<IdentityDocument, CacheError>;
}

/// `IdentityCache` backed by a map of validated documents.
///
/// Each `immediately_caching` call is one bounded fetch; documents that
/// are unsigned, empty, or published under a different address are refused.
pub struct IdentityCacheClient<F: IdentityFetcher> {
    fetcher: F,
    documents: RwLock<HashMap<IdUrl, IdentityDocument>>,
}

impl<F: IdentityFetcher> IdentityCacheClient<F> {
    /// Create an empty cache over `fetcher`.
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            documents: RwLock::new(HashMap::new()),
        }
    }

    /// Insert a document obtained elsewhere. Returns false if it is invalid.
    pub fn insert(&self, document: IdentityDocument) -> bool {
        if !document.is_valid() {
            return false;
        }
        self.documents
            .write()
            .insert(document.idurl.clone(), document);
        true
    }

    /// Cached document for `idurl`.
    pub fn get(&self, idurl: &IdUrl) -> Option<IdentityDocument> {
        self.documents.read().get(idurl).cloned()
    }

    /// Forget the document for `idurl`.
    pub fn remove(&self, idurl: &IdUrl) -> Option<IdentityDocument> {
        self.documents.write().remove(idurl)
    }

    /// Number of cached documents.
    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }
}

#[async_trait]
impl<F: IdentityFetcher> IdentityCache for IdentityCacheClient<F> {
    fn has_key(&self, idurl: &IdUrl) -> bool {
        self.documents.read().contains_key(idurl)
    }

    async fn immediately_caching(
        &self,
        idurl: &IdUrl,
        timeout: Duration,
    ) -> Result<IdentityDocument, CacheError> {
        let document = tokio::time::timeout(timeout, self.fetcher.fetch(idurl))
            .await
            .map_err(|_| CacheError::Timeout(timeout))??;

        if &document.idurl != idurl || !document.is_valid() {
            debug!(idurl = %idurl, "refusing fetched identity");
            return Err(CacheError::InvalidDocument);
        }

        self.documents
            .write()
            .insert(idurl.clone(), document.clone());
        Ok(document)
    }
}

//! Product and category cache.
//!
//! Both lists are fetched together and cached as one snapshot using `moka`.
//! Without a configured TTL the snapshot lives until invalidated or
//! force-refreshed.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use cablestore_core::{Category, CategoryId, Product, ProductId, ProductUpdate};
use chrono::{DateTime, Utc};
use moka::future::Cache;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::error::{ErrorKind, Result};
use crate::http::{ApiClient, ApiRequest};
use crate::notifications::NotificationCenter;

/// Page size for the category list.
pub const CATEGORY_LIMIT: u32 = 100;
/// Page size for the product list.
pub const PRODUCT_LIMIT: u32 = 1000;

/// Fallback when the catalog cannot be loaded.
pub const LOAD_FAILED_MESSAGE: &str = "Failed to load the product catalog.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum CacheKey {
    Catalog,
}

/// Categories and products from one successful load.
#[derive(Debug, Clone)]
pub struct CatalogSnapshot {
    pub categories: Vec<Category>,
    pub products: Vec<Product>,
    pub fetched_at: DateTime<Utc>,
}

impl CatalogSnapshot {
    #[must_use]
    pub fn product(&self, id: ProductId) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    /// Products filed under `category`.
    pub fn products_in(&self, category: CategoryId) -> impl Iterator<Item = &Product> {
        self.products
            .iter()
            .filter(move |p| p.category_id == Some(category))
    }
}

/// Process-wide catalog cache.
///
/// Cheap to clone; clones share one cache.
#[derive(Clone)]
pub struct CatalogCache {
    inner: Arc<CatalogCacheInner>,
}

struct CatalogCacheInner {
    api: ApiClient,
    notifications: NotificationCenter,
    cache: Cache<CacheKey, Arc<CatalogSnapshot>>,
    loading: watch::Sender<bool>,
    pending: AtomicUsize,
}

impl std::fmt::Debug for CatalogCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogCache")
            .field("entries", &self.inner.cache.entry_count())
            .field("loading", &*self.inner.loading.borrow())
            .finish_non_exhaustive()
    }
}

/// Holds the loading flag up until the last overlapping load finishes.
///
/// The counter only changes under the watch channel's lock.
struct Loading<'a> {
    flag: &'a watch::Sender<bool>,
    pending: &'a AtomicUsize,
}

impl<'a> Loading<'a> {
    fn start(flag: &'a watch::Sender<bool>, pending: &'a AtomicUsize) -> Self {
        flag.send_if_modified(|loading| {
            pending.fetch_add(1, Ordering::Relaxed);
            !std::mem::replace(loading, true)
        });
        Self { flag, pending }
    }
}

impl Drop for Loading<'_> {
    fn drop(&mut self) {
        self.flag.send_if_modified(|loading| {
            let still_loading = self.pending.fetch_sub(1, Ordering::Relaxed) > 1;
            std::mem::replace(loading, still_loading) != still_loading
        });
    }
}

impl CatalogCache {
    /// Create an empty cache; `ttl` of `None` never expires entries.
    #[must_use]
    pub fn new(api: ApiClient, notifications: NotificationCenter, ttl: Option<Duration>) -> Self {
        let builder = Cache::builder().max_capacity(1);
        let cache = match ttl {
            Some(ttl) => builder.time_to_live(ttl).build(),
            None => builder.build(),
        };

        Self {
            inner: Arc::new(CatalogCacheInner {
                api,
                notifications,
                cache,
                loading: watch::Sender::new(false),
                pending: AtomicUsize::new(0),
            }),
        }
    }

    /// Load categories and products.
    ///
    /// Returns the cached snapshot without any network call when one exists,
    /// its product list is non-empty and `force` is false. Otherwise both
    /// lists are fetched concurrently and replace the cache together.
    ///
    /// # Errors
    ///
    /// Returns the first failing request's error; the cache is unchanged and
    /// an error toast is shown.
    #[instrument(skip(self))]
    pub async fn fetch_all(&self, force: bool) -> Result<Arc<CatalogSnapshot>> {
        if !force
            && let Some(snapshot) = self.snapshot().await
            && !snapshot.products.is_empty()
        {
            debug!("Catalog cache hit");
            return Ok(snapshot);
        }

        let _loading = Loading::start(&self.inner.loading, &self.inner.pending);
        let categories = ApiRequest::get("/categories/").query("limit", CATEGORY_LIMIT);
        let products = ApiRequest::get("/products/").query("limit", PRODUCT_LIMIT);

        let fetched = tokio::try_join!(
            self.inner.api.fetch::<Vec<Category>>(&categories),
            self.inner.api.fetch::<Vec<Product>>(&products),
        );
        let (categories, products) = match fetched {
            Ok(lists) => lists,
            Err(e) => {
                warn!(error = %e, "Catalog load failed");
                if e.kind() != ErrorKind::AuthExpired {
                    self.inner.notifications.error(e.user_message(LOAD_FAILED_MESSAGE));
                }
                return Err(e);
            }
        };

        info!(
            categories = categories.len(),
            products = products.len(),
            "Catalog loaded"
        );
        let snapshot = Arc::new(CatalogSnapshot {
            categories,
            products,
            fetched_at: Utc::now(),
        });
        self.inner
            .cache
            .insert(CacheKey::Catalog, Arc::clone(&snapshot))
            .await;
        Ok(snapshot)
    }

    /// Cached snapshot, if any, without loading.
    pub async fn snapshot(&self) -> Option<Arc<CatalogSnapshot>> {
        self.inner.cache.get(&CacheKey::Catalog).await
    }

    /// Cached products, loading them first if needed.
    ///
    /// # Errors
    ///
    /// See [`Self::fetch_all`].
    pub async fn products(&self) -> Result<Vec<Product>> {
        Ok(self.fetch_all(false).await?.products.clone())
    }

    /// Cached categories, loading them first if needed.
    ///
    /// # Errors
    ///
    /// See [`Self::fetch_all`].
    pub async fn categories(&self) -> Result<Vec<Category>> {
        Ok(self.fetch_all(false).await?.categories.clone())
    }

    /// Update a product (`PUT /products/{id}`) and patch the cached copy.
    ///
    /// # Errors
    ///
    /// Returns the API error; the cache is unchanged on failure.
    #[instrument(skip(self, update))]
    pub async fn update_product(&self, id: ProductId, update: &ProductUpdate) -> Result<Product> {
        let request = ApiRequest::put(format!("/products/{id}")).json(update)?;
        let product: Product = self.inner.api.fetch(&request).await?;

        if let Some(snapshot) = self.snapshot().await {
            let mut patched = (*snapshot).clone();
            if let Some(slot) = patched.products.iter_mut().find(|p| p.id == id) {
                *slot = product.clone();
                self.inner
                    .cache
                    .insert(CacheKey::Catalog, Arc::new(patched))
                    .await;
            }
        }
        info!(product_id = %id, "Product updated");
        Ok(product)
    }

    /// Drop the cached snapshot; the next fetch goes to the network.
    pub async fn invalidate(&self) {
        self.inner.cache.invalidate_all();
        self.inner.cache.run_pending_tasks().await;
    }

    /// Whether a successful load is cached.
    pub async fn is_loaded(&self) -> bool {
        self.snapshot().await.is_some()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        *self.inner.loading.borrow()
    }

    /// Observe the loading flag.
    #[must_use]
    pub fn subscribe_loading(&self) -> watch::Receiver<bool> {
        self.inner.loading.subscribe()
    }
}

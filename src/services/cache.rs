use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::error::CatalogError;
use crate::models::{CandidateQuery, Ranking, RankingPeriod, Venue};
use crate::services::catalog::VenueCatalog;

/// Read-through cache in front of a venue catalog
///
/// Catalog lookups are memoised for a short TTL. Results are whole
/// snapshots, so a request never mixes cached and fresh venues.
pub struct CachedCatalog<C> {
    inner: C,
    venues: moka::future::Cache<String, Arc<Vec<Venue>>>,
    rankings: moka::future::Cache<String, Arc<Vec<Ranking>>>,
}

impl<C: VenueCatalog> CachedCatalog<C> {
    pub fn new(inner: C, max_entries: u64, ttl_secs: u64) -> Self {
        let venues = moka::future::CacheBuilder::new(max_entries)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();
        let rankings = moka::future::CacheBuilder::new(max_entries)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();

        Self {
            inner,
            venues,
            rankings,
        }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// Number of cached venue lists
    pub fn entry_count(&self) -> u64 {
        self.venues.entry_count()
    }

    pub async fn invalidate_all(&self) {
        self.venues.invalidate_all();
        self.rankings.invalidate_all();
        self.venues.run_pending_tasks().await;
        self.rankings.run_pending_tasks().await;
        tracing::debug!("Catalog cache cleared");
    }

    async fn cached_venues<F>(&self, key: String, fetch: F) -> Result<Vec<Venue>, CatalogError>
    where
        F: std::future::Future<Output = Result<Vec<Venue>, CatalogError>>,
    {
        if let Some(hit) = self.venues.get(&key).await {
            tracing::trace!("Catalog cache hit: {}", key);
            return Ok(hit.as_ref().clone());
        }

        tracing::trace!("Catalog cache miss: {}", key);
        let venues = fetch.await?;
        self.venues.insert(key, Arc::new(venues.clone())).await;
        Ok(venues)
    }
}

#[async_trait]
impl<C: VenueCatalog> VenueCatalog for CachedCatalog<C> {
    async fn venues_in_bounds(&self, query: &CandidateQuery) -> Result<Vec<Venue>, CatalogError> {
        self.cached_venues(CacheKey::bounds(query), self.inner.venues_in_bounds(query))
            .await
    }

    async fn all_venues(&self, category: Option<&str>) -> Result<Vec<Venue>, CatalogError> {
        self.cached_venues(CacheKey::all(category), self.inner.all_venues(category))
            .await
    }

    async fn rankings(&self, period: RankingPeriod) -> Result<Vec<Ranking>, CatalogError> {
        let key = CacheKey::rankings(period);
        if let Some(hit) = self.rankings.get(&key).await {
            tracing::trace!("Catalog cache hit: {}", key);
            return Ok(hit.as_ref().clone());
        }

        let rankings = self.inner.rankings(period).await?;
        self.rankings.insert(key, Arc::new(rankings.clone())).await;
        Ok(rankings)
    }

    async fn health_check(&self) -> Result<bool, CatalogError> {
        self.inner.health_check().await
    }
}

/// Cache key builder
pub struct CacheKey;

impl CacheKey {
    /// Bounding boxes are keyed at ~100m precision so nearby requests share entries
    pub fn bounds(query: &CandidateQuery) -> String {
        let b = &query.bounding_box;
        format!(
            "bounds:{:.3}:{:.3}:{:.3}:{:.3}:{}",
            b.min_lat,
            b.max_lat,
            b.min_lng,
            b.max_lng,
            category_key(query.category.as_deref())
        )
    }

    pub fn all(category: Option<&str>) -> String {
        format!("all:{}", category_key(category))
    }

    pub fn rankings(period: RankingPeriod) -> String {
        format!("rankings:{}", period)
    }
}

fn category_key(category: Option<&str>) -> String {
    category.map_or_else(|| "*".to_string(), str::to_lowercase)
}

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use crate::core::distance::is_within_bounding_box;
use crate::core::trend::determine_trend;
use crate::error::CatalogError;
use crate::models::{CandidateQuery, Ranking, RankingPeriod, Venue, VenueId};

/// Source of venue snapshots
///
/// Implementations own storage and any upstream rating/places lookups; the
/// selection pipeline only sees the returned values.
#[async_trait]
pub trait VenueCatalog: Send + Sync {
    /// Venues whose stored coordinates fall inside the query's bounding box
    async fn venues_in_bounds(&self, query: &CandidateQuery) -> Result<Vec<Venue>, CatalogError>;

    /// Every venue, optionally restricted to one category
    async fn all_venues(&self, category: Option<&str>) -> Result<Vec<Venue>, CatalogError>;

    /// Stored ranking snapshot for a period, empty when none was published
    async fn rankings(&self, period: RankingPeriod) -> Result<Vec<Ranking>, CatalogError>;

    async fn health_check(&self) -> Result<bool, CatalogError> {
        Ok(true)
    }
}

/// On-disk catalog layout
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    #[serde(default)]
    pub venues: Vec<Venue>,
    #[serde(default)]
    pub rankings: Vec<Ranking>,
}

/// Catalog held entirely in memory, typically loaded from a JSON export
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    venues: Vec<Venue>,
    rankings: BTreeMap<RankingPeriod, Vec<Ranking>>,
}

impl InMemoryCatalog {
    /// Build a catalog, validating every venue and ranking snapshot
    ///
    /// Venues without a current ranking pick up their entry from the most
    /// recent stored period.
    pub fn new(venues: Vec<Venue>, rankings: Vec<Ranking>) -> Result<Self, CatalogError> {
        let mut by_period: BTreeMap<RankingPeriod, Vec<Ranking>> = BTreeMap::new();
        for ranking in rankings {
            by_period.entry(ranking.period).or_default().push(ranking);
        }
        for snapshot in by_period.values_mut() {
            snapshot.sort_by_key(|r| r.rank);
            validate_snapshot(snapshot)?;
        }

        let latest: HashMap<VenueId, Ranking> = by_period
            .values()
            .next_back()
            .map(|snapshot| {
                snapshot
                    .iter()
                    .map(|r| (r.venue_id.clone(), r.clone()))
                    .collect()
            })
            .unwrap_or_default();

        let mut seen = HashSet::with_capacity(venues.len());
        let mut checked = Vec::with_capacity(venues.len());
        for mut venue in venues {
            validate_venue(&venue)?;
            if !seen.insert(venue.id.clone()) {
                return Err(invalid(&venue.id, "duplicate venue id"));
            }
            if venue.ranking.is_none() {
                venue.ranking = latest.get(&venue.id).cloned();
            }
            checked.push(venue);
        }

        Ok(Self {
            venues: checked,
            rankings: by_period,
        })
    }

    pub fn from_snapshot(snapshot: CatalogSnapshot) -> Result<Self, CatalogError> {
        Self::new(snapshot.venues, snapshot.rankings)
    }

    /// Load a catalog export from a JSON file
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let raw = tokio::fs::read_to_string(path.as_ref()).await?;
        let snapshot: CatalogSnapshot = serde_json::from_str(&raw)?;
        tracing::debug!(
            "Parsed catalog {}: {} venues, {} rankings",
            path.as_ref().display(),
            snapshot.venues.len(),
            snapshot.rankings.len()
        );
        Self::from_snapshot(snapshot)
    }

    pub fn len(&self) -> usize {
        self.venues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.venues.is_empty()
    }
}

#[async_trait]
impl VenueCatalog for InMemoryCatalog {
    async fn venues_in_bounds(&self, query: &CandidateQuery) -> Result<Vec<Venue>, CatalogError> {
        Ok(self
            .venues
            .iter()
            .filter(|v| v.in_category(query.category.as_deref()))
            .filter(|v| is_within_bounding_box(v.location, &query.bounding_box))
            .cloned()
            .collect())
    }

    async fn all_venues(&self, category: Option<&str>) -> Result<Vec<Venue>, CatalogError> {
        Ok(self
            .venues
            .iter()
            .filter(|v| v.in_category(category))
            .cloned()
            .collect())
    }

    async fn rankings(&self, period: RankingPeriod) -> Result<Vec<Ranking>, CatalogError> {
        Ok(self.rankings.get(&period).cloned().unwrap_or_default())
    }
}

fn invalid(id: &VenueId, reason: impl Into<String>) -> CatalogError {
    CatalogError::InvalidVenue {
        id: id.clone(),
        reason: reason.into(),
    }
}

fn validate_venue(venue: &Venue) -> Result<(), CatalogError> {
    if !venue.location.is_valid() {
        return Err(invalid(&venue.id, "coordinates out of range"));
    }
    for rating in &venue.ratings {
        if !rating.value.is_finite() || !(0.0..=5.0).contains(&rating.value) {
            return Err(invalid(&venue.id, format!("rating {} outside 0-5", rating.value)));
        }
    }
    if let Some(expert) = &venue.expert {
        if !expert.boost.is_finite() || expert.boost < 1.0 {
            return Err(invalid(&venue.id, "expert boost must be at least 1"));
        }
    }
    if let Some(buzz) = venue.social_buzz {
        if !buzz.is_finite() || !(0.0..=100.0).contains(&buzz) {
            return Err(invalid(&venue.id, "social buzz outside 0-100"));
        }
    }
    Ok(())
}

/// Checks one period's snapshot, which must be sorted by rank
///
/// Ranks run exactly 1..=N with each venue once, scores never rise as rank
/// falls, and every stored trend matches the recorded rank movement.
fn validate_snapshot(snapshot: &[Ranking]) -> Result<(), CatalogError> {
    let mut seen = HashSet::with_capacity(snapshot.len());
    for (index, ranking) in snapshot.iter().enumerate() {
        if ranking.rank != index as u32 + 1 {
            return Err(invalid(
                &ranking.venue_id,
                format!(
                    "rank {} breaks the 1..{} sequence of period {}",
                    ranking.rank,
                    snapshot.len(),
                    ranking.period
                ),
            ));
        }
        if !seen.insert(&ranking.venue_id) {
            return Err(invalid(
                &ranking.venue_id,
                format!("ranked twice in period {}", ranking.period),
            ));
        }
        if !ranking.score.is_finite() {
            return Err(invalid(&ranking.venue_id, "ranking score is not finite"));
        }
        if let Some(above) = index.checked_sub(1).map(|i| &snapshot[i]) {
            if ranking.score > above.score {
                return Err(invalid(
                    &ranking.venue_id,
                    format!(
                        "score {} at rank {} beats {} at rank {}",
                        ranking.score, ranking.rank, above.score, above.rank
                    ),
                ));
            }
        }
        let expected = determine_trend(ranking.rank, ranking.previous_rank);
        if ranking.trend != expected {
            return Err(invalid(
                &ranking.venue_id,
                format!(
                    "trend {:?} by {} does not match rank {} from {:?}",
                    ranking.trend.direction,
                    ranking.trend.magnitude,
                    ranking.rank,
                    ranking.previous_rank
                ),
            ));
        }
    }
    Ok(())
}

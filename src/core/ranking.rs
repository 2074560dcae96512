use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use crate::core::trend::determine_trend;
use crate::error::RankingError;
use crate::models::{Ranking, RankingPeriod, VenueId};

/// Assign monthly ranks from snapshot scores
///
/// Scores are sorted descending; equal scores fall back to venue id
/// ascending so the outcome never depends on input order. Ranks form the
/// contiguous sequence 1..=N and each entry carries its trend against the
/// previous period's rank.
pub fn build_rankings(
    period: RankingPeriod,
    scores: &[(VenueId, f64)],
    previous_ranks: &HashMap<VenueId, u32>,
) -> Result<Vec<Ranking>, RankingError> {
    let mut seen = HashSet::with_capacity(scores.len());
    for (venue_id, score) in scores {
        if !score.is_finite() {
            return Err(RankingError::NonFiniteScore(venue_id.clone()));
        }
        if !seen.insert(venue_id) {
            return Err(RankingError::DuplicateVenue(venue_id.clone()));
        }
    }

    let mut ordered: Vec<&(VenueId, f64)> = scores.iter().collect();
    ordered.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });

    let rankings = ordered
        .into_iter()
        .enumerate()
        .map(|(index, (venue_id, score))| {
            let rank = index as u32 + 1;
            let previous_rank = previous_ranks.get(venue_id).copied();
            Ranking {
                venue_id: venue_id.clone(),
                period,
                score: *score,
                rank,
                previous_rank,
                trend: determine_trend(rank, previous_rank),
            }
        })
        .collect();

    Ok(rankings)
}

/// Index a snapshot by venue for previous-rank lookups
pub fn rank_index(rankings: &[Ranking]) -> HashMap<VenueId, u32> {
    rankings
        .iter()
        .map(|r| (r.venue_id.clone(), r.rank))
        .collect()
}

use actix_web::{web, HttpResponse};
use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::sync::Arc;
use validator::Validate;

use crate::config::SelectionSettings;
use crate::core::{calculate_bounding_box, SelectionMode, Selector};
use crate::error::{ApiError, ParamError};
use crate::models::{
    CandidateQuery, HealthResponse, MonthlyQuery, MonthlyRankingsResponse, ScoringInput,
    SelectionResponse, VenueQuery,
};
use crate::services::VenueCatalog;

/// Source of the venue-local wall clock
pub type Clock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

pub fn local_clock() -> Clock {
    Arc::new(|| chrono::Local::now().naive_local())
}

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<dyn VenueCatalog>,
    pub selector: Selector,
    pub selection: SelectionSettings,
    pub clock: Clock,
}

/// Configure all venue-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/venues/tonight", web::get().to(tonight))
        .route("/venues/nearby", web::get().to(nearby))
        .route("/venues/trending", web::get().to(trending))
        .route("/rankings/monthly", web::get().to(monthly))
        .route("/score", web::post().to(score));
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let healthy = match state.catalog.health_check().await {
        Ok(ok) => ok,
        Err(e) => {
            tracing::warn!("Catalog health check failed: {}", e);
            false
        }
    };

    let status = if healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// GET /api/v1/venues/tonight?lat=..&lng=..
///
/// Venues with deals on right now first, then venues with events today,
/// then everything else by power score.
async fn tonight(
    state: web::Data<AppState>,
    query: web::Query<VenueQuery>,
) -> Result<HttpResponse, ApiError> {
    select_nearby(&state, SelectionMode::Tonight, query.into_inner()).await
}

/// GET /api/v1/venues/nearby?lat=..&lng=..&sort=distance|score
async fn nearby(
    state: web::Data<AppState>,
    query: web::Query<VenueQuery>,
) -> Result<HttpResponse, ApiError> {
    select_nearby(&state, SelectionMode::Nearby, query.into_inner()).await
}

/// GET /api/v1/venues/trending?lat=..&lng=..
async fn trending(
    state: web::Data<AppState>,
    query: web::Query<VenueQuery>,
) -> Result<HttpResponse, ApiError> {
    select_nearby(&state, SelectionMode::Trending, query.into_inner()).await
}

async fn select_nearby(
    state: &AppState,
    mode: SelectionMode,
    query: VenueQuery,
) -> Result<HttpResponse, ApiError> {
    let now = (state.clock)();
    let request = query.into_request(
        mode,
        state.selection.for_mode(mode),
        state.selection.max_limit,
        now,
    )?;
    let origin = request.origin.ok_or(ParamError::Missing("lat"))?;

    let candidate_query = CandidateQuery {
        bounding_box: calculate_bounding_box(origin, request.radius_miles),
        category: request.category.clone(),
    };
    let candidates = state.catalog.venues_in_bounds(&candidate_query).await?;

    tracing::debug!(
        "Fetched {} {:?} candidates around ({}, {})",
        candidates.len(),
        mode,
        origin.latitude,
        origin.longitude
    );

    let selection = state.selector.select(&request, candidates)?;

    tracing::info!(
        "Returning {} {:?} venues (from {} candidates, radius {}mi)",
        selection.venues.len(),
        mode,
        selection.total_candidates,
        request.radius_miles
    );

    Ok(HttpResponse::Ok().json(SelectionResponse {
        mode,
        venues: selection.venues,
        total_candidates: selection.total_candidates,
        generated_at: now,
    }))
}

/// GET /api/v1/rankings/monthly?period=YYYY-MM
///
/// Serves the stored snapshot for the period. When none was published the
/// period is ranked live against the previous month's snapshot.
async fn monthly(
    state: web::Data<AppState>,
    query: web::Query<MonthlyQuery>,
) -> Result<HttpResponse, ApiError> {
    let now = (state.clock)();
    let (period, request) = query.into_inner().into_request(
        state.selection.monthly,
        state.selection.max_limit,
        now,
    )?;

    let mut venues = state.catalog.all_venues(None).await?;
    let stored = state.catalog.rankings(period).await?;

    let computed = stored.is_empty();
    let rankings = if computed {
        let previous = state.catalog.rankings(period.previous()).await?;
        state.selector.rank_live(period, &venues, &previous)?
    } else {
        stored
    };

    let mut by_venue: HashMap<_, _> = rankings
        .into_iter()
        .map(|r| (r.venue_id.clone(), r))
        .collect();
    for venue in &mut venues {
        venue.ranking = by_venue.remove(&venue.id);
    }

    let selection = state.selector.select(&request, venues)?;

    tracing::info!(
        "Returning {} ranked venues for {} ({})",
        selection.venues.len(),
        period,
        if computed { "live" } else { "stored" }
    );

    Ok(HttpResponse::Ok().json(MonthlyRankingsResponse {
        period,
        computed,
        venues: selection.venues,
    }))
}

/// POST /api/v1/score
///
/// Scores raw signals directly, for auditing the formula.
async fn score(
    state: web::Data<AppState>,
    input: web::Json<ScoringInput>,
) -> Result<HttpResponse, ApiError> {
    input.validate().map_err(ParamError::from)?;
    let result = state.selector.engine().score(&input);

    tracing::debug!(
        "Scored venue {:?}: {} ({})",
        input.venue_id.as_str(),
        result.power_score,
        result.explanation
    );

    Ok(HttpResponse::Ok().json(result))
}

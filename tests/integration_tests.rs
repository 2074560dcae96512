// Integration tests for Nightrank

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use nightrank::config::SelectionSettings;
use nightrank::core::{
    calculate_bounding_box, haversine_distance, NearbySort, SelectionMode, SelectionRequest,
    Selector,
};
use nightrank::models::{
    CandidateQuery, Coordinates, DaySet, Deal, DealKind, Event, ExpertDesignation, Rating,
    RatingSource, RankingPeriod, TrendDirection, Venue, VenueId, VenueQuery,
};
use nightrank::services::{CachedCatalog, InMemoryCatalog, VenueCatalog};
use nightrank::ParamError;

const NYC: Coordinates = Coordinates { latitude: 40.7128, longitude: -74.0060 };

// 2026-10-16 is a Friday
fn friday_night() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 10, 16).unwrap().and_hms_opt(21, 0, 0).unwrap()
}

fn create_test_venue(id: &str, category: &str, lat: f64, lng: f64, google: f64) -> Venue {
    Venue {
        id: VenueId::new(id),
        name: format!("Venue {}", id),
        category: category.to_string(),
        location: Coordinates { latitude: lat, longitude: lng },
        ratings: vec![Rating { source: RatingSource::Google, value: google, review_count: 120 }],
        recent_review_count: 10,
        total_review_count: 120,
        deals: vec![],
        events: vec![],
        opening_hours: vec![],
        expert: None,
        social_buzz: None,
        ranking: None,
    }
}

fn with_deal(mut venue: Venue) -> Venue {
    venue.deals.push(Deal {
        title: "Half-price cocktails".to_string(),
        days: DaySet::All,
        start_time: NaiveTime::from_hms_opt(18, 0, 0),
        end_time: NaiveTime::from_hms_opt(22, 0, 0),
        is_active: true,
        kind: DealKind::Special,
    });
    venue
}

fn with_event(mut venue: Venue) -> Venue {
    venue.events.push(Event {
        title: "Live jazz".to_string(),
        starts_at: friday_night(),
    });
    venue
}

fn request(mode: SelectionMode, limit: usize) -> SelectionRequest {
    SelectionRequest {
        mode,
        origin: Some(NYC),
        radius_miles: 10.0,
        limit,
        category: None,
        sort: NearbySort::Distance,
        now: friday_night(),
    }
}

#[test]
fn test_integration_tonight_ordering() {
    let selector = Selector::with_defaults();

    // C outscores B which outscores A, yet deals and events come first
    let mut c = create_test_venue("c", "bar", 40.7130, -74.0062, 5.0);
    c.expert = Some(ExpertDesignation { boost: 1.5, note: None });
    let candidates = vec![
        c,
        with_event(create_test_venue("b", "bar", 40.7200, -74.0100, 4.5)),
        with_deal(create_test_venue("a", "bar", 40.7300, -74.0200, 3.2)),
    ];

    let selection = selector
        .select(&request(SelectionMode::Tonight, 10), candidates)
        .unwrap();
    let ids: Vec<&str> = selection.venues.iter().map(|v| v.venue_id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);

    let scores: Vec<f64> = selection.venues.iter().map(|v| v.power_score).collect();
    assert!(scores[2] > scores[1], "C should outscore B: {:?}", scores);
    assert!(scores[1] > scores[0], "B should outscore A: {:?}", scores);

    assert_eq!(selection.venues[0].active_deals, vec!["Half-price cocktails"]);
    assert_eq!(selection.venues[1].events_tonight, vec!["Live jazz"]);
}

#[tokio::test]
async fn test_integration_catalog_to_selection() {
    let catalog = InMemoryCatalog::new(
        vec![
            create_test_venue("1", "bar", 40.72, -74.01, 4.6),
            create_test_venue("2", "club", 40.73, -74.02, 4.1),
            create_test_venue("3", "bar", 40.71, -74.00, 3.8),
            create_test_venue("4", "bar", 40.70, -73.99, 4.9),
            create_test_venue("far", "bar", 41.50, -74.00, 5.0),
        ],
        vec![],
    )
    .unwrap();
    let catalog = CachedCatalog::new(catalog, 100, 60);
    let selector = Selector::with_defaults();

    let mut req = request(SelectionMode::Nearby, 20);
    req.category = Some("bar".to_string());

    let query = CandidateQuery {
        bounding_box: calculate_bounding_box(NYC, req.radius_miles),
        category: req.category.clone(),
    };
    let candidates = catalog.venues_in_bounds(&query).await.unwrap();
    assert_eq!(candidates.len(), 3, "far venue and the club are pre-filtered");

    let selection = selector.select(&req, candidates).unwrap();
    assert_eq!(selection.total_candidates, 3);

    // Sorted by distance, every distance within radius
    for pair in selection.venues.windows(2) {
        assert!(pair[0].distance <= pair[1].distance);
    }
    for venue in &selection.venues {
        let distance = venue.distance.unwrap();
        assert!(distance <= req.radius_miles);
        assert_eq!(distance, haversine_distance(NYC, venue.location));
        assert!(venue.power_score >= 0.0 && venue.power_score <= 150.0);
    }

    // Same query is served from cache
    let again = catalog.venues_in_bounds(&query).await.unwrap();
    assert_eq!(again.len(), 3);
    assert!(catalog.entry_count() <= 1);
}

#[test]
fn test_integration_nearby_across_antimeridian() {
    let selector = Selector::with_defaults();
    let origin = Coordinates { latitude: 0.0, longitude: 179.99 };
    let catalog = InMemoryCatalog::new(
        vec![
            create_test_venue("east", "bar", 0.0, -179.99, 4.2),
            create_test_venue("west", "bar", 0.0, 179.95, 4.0),
        ],
        vec![],
    )
    .unwrap();

    let mut req = request(SelectionMode::Nearby, 10);
    req.origin = Some(origin);
    let query = CandidateQuery {
        bounding_box: calculate_bounding_box(origin, req.radius_miles),
        category: None,
    };
    let candidates = tokio_test::block_on(catalog.venues_in_bounds(&query)).unwrap();
    assert_eq!(candidates.len(), 2);

    let selection = selector.select(&req, candidates).unwrap();
    let ids: Vec<&str> = selection.venues.iter().map(|v| v.venue_id.as_str()).collect();
    assert_eq!(ids, vec!["east", "west"]);
}

#[test]
fn test_integration_score_sort_and_limit() {
    let selector = Selector::with_defaults();
    let candidates: Vec<Venue> = (0..30)
        .map(|i| {
            create_test_venue(
                &format!("v{:02}", i),
                "bar",
                40.7128 + (i as f64 * 0.001),
                -74.0060,
                3.0 + (i % 20) as f64 * 0.1,
            )
        })
        .collect();

    let mut req = request(SelectionMode::Nearby, 10);
    req.sort = NearbySort::Score;
    let selection = selector.select(&req, candidates).unwrap();

    assert_eq!(selection.venues.len(), 10, "Should not exceed limit of 10");
    assert_eq!(selection.total_candidates, 30);
    for pair in selection.venues.windows(2) {
        assert!(pair[0].power_score >= pair[1].power_score);
    }
}

#[test]
fn test_integration_live_ranking_is_contiguous() {
    let selector = Selector::with_defaults();
    let period = RankingPeriod::new(2026, 10).unwrap();

    // "twin-a" and "twin-b" are identical apart from their ids
    let venues = vec![
        create_test_venue("twin-b", "bar", 40.72, -74.01, 4.0),
        create_test_venue("top", "bar", 40.72, -74.01, 4.8),
        create_test_venue("twin-a", "bar", 40.72, -74.01, 4.0),
    ];
    let previous = selector
        .rank_live(period.previous(), &venues[..1], &[])
        .unwrap();

    let rankings = selector
        .rank_live(period, &venues, &previous)
        .unwrap();

    let order: Vec<(&str, u32)> = rankings
        .iter()
        .map(|r| (r.venue_id.as_str(), r.rank))
        .collect();
    assert_eq!(order, vec![("top", 1), ("twin-a", 2), ("twin-b", 3)]);

    assert_eq!(rankings[0].trend.direction, TrendDirection::New);
    // twin-b was first of one last month, now third
    assert_eq!(rankings[2].previous_rank, Some(1));
    assert_eq!(rankings[2].trend.direction, TrendDirection::Down);
    assert_eq!(rankings[2].trend.magnitude, 2);
}

#[test]
fn test_integration_missing_location_rejected() {
    let query = VenueQuery {
        lat: Some("40.7128".to_string()),
        ..VenueQuery::default()
    };
    let settings = SelectionSettings::default();
    let result = query.into_request(
        SelectionMode::Tonight,
        settings.tonight,
        settings.max_limit,
        friday_night(),
    );
    assert!(matches!(result, Err(ParamError::Missing(_))));

    // The pipeline itself refuses too
    let mut req = request(SelectionMode::Trending, 10);
    req.origin = None;
    let selector = Selector::with_defaults();
    assert!(selector.select(&req, vec![]).is_err());
}

#[tokio::test]
async fn test_integration_sample_catalog() {
    let catalog = InMemoryCatalog::load("data/venues.json").await.unwrap();
    assert!(!catalog.is_empty());

    let selector = Selector::with_defaults();
    let venues = catalog.all_venues(None).await.unwrap();
    let selection = selector
        .select(&request(SelectionMode::Tonight, 50), venues)
        .unwrap();

    // Deal venues lead, and the block of deal venues is contiguous
    let flags: Vec<bool> = selection.venues.iter().map(|v| v.has_deals_tonight).collect();
    let first_without = flags.iter().position(|f| !f).unwrap_or(flags.len());
    assert!(flags[first_without..].iter().all(|f| !f));

    let stored = catalog
        .rankings(RankingPeriod::new(2026, 9).unwrap())
        .await
        .unwrap();
    let ranks: Vec<u32> = stored.iter().map(|r| r.rank).collect();
    assert_eq!(ranks, (1..=stored.len() as u32).collect::<Vec<_>>());
}

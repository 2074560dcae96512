use chrono::{Datelike, NaiveDateTime};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::selector::{NearbySort, SelectionMode, SelectionRequest};
use crate::error::ParamError;
use crate::models::domain::{Coordinates, RankingPeriod};

/// Per-mode fallbacks for omitted query parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModeDefaults {
    pub radius_miles: f64,
    pub limit: usize,
}

/// Raw query of the location-aware venue endpoints
///
/// Every field stays a string so bad numbers are reported by name instead
/// of failing inside the extractor.
///
/// `GET /api/v1/venues/{tonight|nearby|trending}?lat=..&lng=..&radius=..&limit=..`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VenueQuery {
    pub lat: Option<String>,
    pub lng: Option<String>,
    pub radius: Option<String>,
    pub limit: Option<String>,
    pub category: Option<String>,
    pub sort: Option<String>,
}

/// Raw query of the monthly rankings endpoint
///
/// `GET /api/v1/rankings/monthly?period=2026-10` or `?month=10&year=2026`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonthlyQuery {
    pub period: Option<String>,
    pub month: Option<String>,
    pub year: Option<String>,
    pub limit: Option<String>,
    pub category: Option<String>,
    pub lat: Option<String>,
    pub lng: Option<String>,
}

#[derive(Debug, Validate)]
struct SearchBounds {
    #[validate(range(min = 0.1, max = 100.0))]
    radius: f64,
    #[validate(range(min = 1))]
    limit: usize,
}

impl VenueQuery {
    /// Validate the query and turn it into a pipeline request
    pub fn into_request(
        self,
        mode: SelectionMode,
        defaults: ModeDefaults,
        max_limit: usize,
        now: NaiveDateTime,
    ) -> Result<SelectionRequest, ParamError> {
        let origin = parse_origin(self.lat.as_deref(), self.lng.as_deref())?;
        if mode.requires_location() && origin.is_none() {
            return Err(ParamError::Missing("lat"));
        }

        let radius = parse_f64("radius", self.radius.as_deref())?.unwrap_or(defaults.radius_miles);
        let limit = parse_limit(self.limit.as_deref())?.unwrap_or(defaults.limit);
        SearchBounds { radius, limit }.validate()?;

        let sort = match self.sort.as_deref().map(str::trim) {
            None | Some("") | Some("distance") => NearbySort::Distance,
            Some("score") => NearbySort::Score,
            Some(other) => return Err(ParamError::InvalidSort(other.to_string())),
        };

        Ok(SelectionRequest {
            mode,
            origin,
            radius_miles: radius,
            limit: limit.min(max_limit),
            category: non_empty(self.category),
            sort,
            now,
        })
    }
}

impl MonthlyQuery {
    /// Resolve the requested period, defaulting to the month containing `now`
    pub fn period(&self, now: NaiveDateTime) -> Result<RankingPeriod, ParamError> {
        if let Some(period) = self.period.as_deref().filter(|p| !p.trim().is_empty()) {
            return period.parse();
        }

        match (self.month.as_deref(), self.year.as_deref()) {
            (None, None) => Ok(RankingPeriod::containing(now.date())),
            (None, Some(_)) => Err(ParamError::Missing("month")),
            (Some(month), year) => {
                let month = month.trim().parse::<u32>().map_err(|_| ParamError::InvalidNumber {
                    name: "month",
                    value: month.to_string(),
                })?;
                let year = match year {
                    Some(y) => y.trim().parse::<i32>().map_err(|_| ParamError::InvalidNumber {
                        name: "year",
                        value: y.to_string(),
                    })?,
                    None => now.year(),
                };
                RankingPeriod::new(year, month)
            }
        }
    }

    pub fn into_request(
        self,
        defaults: ModeDefaults,
        max_limit: usize,
        now: NaiveDateTime,
    ) -> Result<(RankingPeriod, SelectionRequest), ParamError> {
        let period = self.period(now)?;
        let origin = parse_origin(self.lat.as_deref(), self.lng.as_deref())?;
        let limit = parse_limit(self.limit.as_deref())?.unwrap_or(defaults.limit);
        SearchBounds {
            radius: defaults.radius_miles,
            limit,
        }
        .validate()?;

        let request = SelectionRequest {
            mode: SelectionMode::Monthly,
            origin,
            radius_miles: defaults.radius_miles,
            limit: limit.min(max_limit),
            category: non_empty(self.category),
            sort: NearbySort::Distance,
            now,
        };
        Ok((period, request))
    }
}

fn parse_origin(lat: Option<&str>, lng: Option<&str>) -> Result<Option<Coordinates>, ParamError> {
    let lat = parse_f64("lat", lat)?;
    let lng = parse_f64("lng", lng)?;
    match (lat, lng) {
        (Some(lat), Some(lng)) => Coordinates::new(lat, lng).map(Some),
        (None, None) => Ok(None),
        (Some(_), None) => Err(ParamError::Missing("lng")),
        (None, Some(_)) => Err(ParamError::Missing("lat")),
    }
}

/// Parse an optional float, rejecting NaN and infinities
fn parse_f64(name: &'static str, raw: Option<&str>) -> Result<Option<f64>, ParamError> {
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return Ok(None);
    };
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(Some(value)),
        _ => Err(ParamError::InvalidNumber {
            name,
            value: raw.to_string(),
        }),
    }
}

fn parse_limit(raw: Option<&str>) -> Result<Option<usize>, ParamError> {
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return Ok(None);
    };
    raw.parse::<usize>()
        .map(Some)
        .map_err(|_| ParamError::InvalidNumber {
            name: "limit",
            value: raw.to_string(),
        })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDateTime, Utc};

use crate::error::ValidationError;

/// Wire format for every timestamp the catalog accepts.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

const EPOCH_START: &str = "1900-01-01T00:00:00Z";

pub fn format_timestamp(at: DateTime<Utc>) -> String { at.format(TIMESTAMP_FORMAT).to_string() }

fn parse_date(kind: &'static str, value: &str) -> Result<DateTime<Utc>, ValidationError> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|_| ValidationError::Date {
            kind,
            value: value.to_string(),
        })
}

pub fn parse_start_date(value: &str) -> Result<DateTime<Utc>, ValidationError> { parse_date("start", value) }

pub fn parse_end_date(value: &str) -> Result<DateTime<Utc>, ValidationError> { parse_date("end", value) }

pub fn parse_minutes(value: &str) -> Result<u32, ValidationError> {
    value
        .trim()
        .parse()
        .map_err(|_| ValidationError::Minutes(value.to_string()))
}

/// `W,S,E,N` in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub west:  f64,
    pub south: f64,
    pub east:  f64,
    pub north: f64,
}

impl BoundingBox {
    pub const GLOBAL: Self = Self {
        west:  -180.0,
        south: -90.0,
        east:  180.0,
        north: 90.0,
    };
}

impl Default for BoundingBox {
    fn default() -> Self { Self::GLOBAL }
}

impl FromStr for BoundingBox {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ValidationError::Bounds(s.to_string());
        let values = s
            .split(',')
            .map(|part| part.parse::<f64>().map_err(|_| err()))
            .collect::<Result<Vec<_>, _>>()?;
        match values.as_slice() {
            &[west, south, east, north] => Ok(Self {
                west,
                south,
                east,
                north,
            }),
            _ => Err(err()),
        }
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.west, self.south, self.east, self.north)
    }
}

/// Which granules a query covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeWindow {
    /// Granules updated in the last `minutes`.
    LookBack { minutes: u32 },
    /// Granules updated since `start` whose acquisition falls in the range.
    Range {
        start: Option<DateTime<Utc>>,
        end:   Option<DateTime<Utc>>,
    },
}

impl TimeWindow {
    pub fn range(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Result<Self, ValidationError> {
        if start.is_none() && end.is_none() {
            return Err(ValidationError::MissingTimeRange);
        }
        Ok(Self::Range { start, end })
    }

    pub fn updated_since(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match *self {
            Self::LookBack { minutes } => Some(now - Duration::minutes(i64::from(minutes))),
            Self::Range { start, .. } => start,
        }
    }
}

/// `start,end` for the catalog's `temporal` parameter.
///
/// An open end is closed with `now`, an open start with 1900-01-01.
pub fn temporal_range(
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<String, ValidationError> {
    match (start, end) {
        (Some(start), Some(end)) => Ok(format!("{},{}", format_timestamp(start), format_timestamp(end))),
        (Some(start), None) => Ok(format!("{},{}", format_timestamp(start), format_timestamp(now))),
        (None, Some(end)) => Ok(format!("{EPOCH_START},{}", format_timestamp(end))),
        (None, None) => Err(ValidationError::MissingTimeRange),
    }
}

/// One granule search, validated.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub collection:   String,
    pub provider:     String,
    pub bounding_box: BoundingBox,
    pub window:       TimeWindow,
    pub page_size:    u32,
}

impl QueryRequest {
    pub const DEFAULT_PAGE_SIZE: u32 = 2000;
    pub const DEFAULT_PROVIDER: &str = "LPCLOUD";

    pub fn new(collection: impl Into<String>, window: TimeWindow) -> Self {
        Self {
            collection: collection.into(),
            provider: Self::DEFAULT_PROVIDER.to_string(),
            bounding_box: BoundingBox::GLOBAL,
            window,
            page_size: Self::DEFAULT_PAGE_SIZE,
        }
    }

    #[must_use]
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }

    #[must_use]
    pub fn bounding_box(mut self, bounding_box: BoundingBox) -> Self {
        self.bounding_box = bounding_box;
        self
    }

    #[must_use]
    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Query parameters for a search evaluated at `now`, token excluded.
    pub fn params(&self, now: DateTime<Utc>) -> Result<Vec<(&'static str, String)>, ValidationError> {
        let mut params = vec![
            ("scroll", "false".to_string()),
            ("page_size", self.page_size.to_string()),
            ("sort_key", "-start_date".to_string()),
            ("provider", self.provider.clone()),
            ("ShortName", self.collection.clone()),
            ("bounding_box", self.bounding_box.to_string()),
        ];
        if let Some(since) = self.window.updated_since(now) {
            params.push(("updated_since", format_timestamp(since)));
        }
        if let TimeWindow::Range { start, end } = self.window {
            params.push(("temporal", temporal_range(start, end, now)?));
        }
        Ok(params)
    }
}

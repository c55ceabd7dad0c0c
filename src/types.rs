//! Types for the CryptoView data layer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One row of the coin list, as returned by the markets endpoint.
///
/// Immutable per fetch; a refresh replaces the whole list, there is no
/// partial merge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coin {
    /// Unique coin identifier (e.g. "bitcoin")
    pub id: String,
    /// Ticker symbol (e.g. "btc")
    pub symbol: String,
    /// Display name
    pub name: String,
    /// Logo URL
    pub image: String,
    /// Current price in USD
    pub current_price: f64,
    /// Market capitalization in USD
    pub market_cap: f64,
    /// Rank by market capitalization (1 = largest)
    pub market_cap_rank: u32,
    /// 24-hour price change percentage (signed)
    pub price_change_percentage_24h: f64,
    /// 24-hour trading volume in USD
    pub total_volume: f64,
}

/// Full detail for a single coin.
///
/// The raw API response nests price, cap, and volume under a `market_data`
/// sub-object; the provider flattens those to the top level before this type
/// ever leaves the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinDetail {
    pub id: String,
    pub symbol: String,
    pub name: String,
    /// Canonical logo URL (the raw payload may carry a string or an object
    /// of sizes; the decode step normalizes both shapes)
    pub image: String,
    /// Current price in USD, from `market_data.current_price.usd`
    pub current_price: f64,
    /// Market capitalization in USD, from `market_data.market_cap.usd`
    pub market_cap: f64,
    /// Rank by market capitalization, absent for unranked coins
    pub market_cap_rank: Option<u32>,
    /// 24-hour trading volume in USD, from `market_data.total_volume.usd`
    pub total_volume: f64,
    pub price_change_percentage_24h: f64,
    pub price_change_percentage_7d: f64,
    pub price_change_percentage_30d: f64,
    pub price_change_percentage_1y: f64,
    /// English description, stored verbatim. May contain upstream HTML;
    /// the render surface must escape or sanitize it before display.
    pub description: String,
}

/// One hit from the search endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub market_cap_rank: Option<u32>,
    /// Thumbnail URL
    #[serde(default)]
    pub thumb: String,
}

/// Display theme, persisted across sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    /// Storage representation of the theme
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    /// Parses a stored theme string; unknown values fall back to the default
    pub fn from_str_or_default(s: &str) -> Self {
        match s {
            "dark" => Theme::Dark,
            _ => Theme::Light,
        }
    }

    /// The opposite theme
    pub fn toggled(&self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

/// Dashboard events for subscribers (the render surface)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DashboardEvent {
    /// The coin list was refreshed
    CoinsRefreshed {
        id: Uuid,
        count: usize,
        timestamp: DateTime<Utc>,
    },

    /// A fetch failed after exhausting its retries
    FetchFailed {
        id: Uuid,
        query: String,
        error_message: String,
        timestamp: DateTime<Utc>,
    },

    /// A coin was favourited or unfavourited
    FavouritesChanged {
        id: Uuid,
        coin_id: String,
        favourited: bool,
        timestamp: DateTime<Utc>,
    },
}

impl DashboardEvent {
    /// Get the event ID
    pub fn id(&self) -> Uuid {
        match self {
            DashboardEvent::CoinsRefreshed { id, .. } => *id,
            DashboardEvent::FetchFailed { id, .. } => *id,
            DashboardEvent::FavouritesChanged { id, .. } => *id,
        }
    }

    /// Get the event type as string
    pub fn event_type(&self) -> &'static str {
        match self {
            DashboardEvent::CoinsRefreshed { .. } => "COINS_REFRESHED",
            DashboardEvent::FetchFailed { .. } => "FETCH_FAILED",
            DashboardEvent::FavouritesChanged { .. } => "FAVOURITES_CHANGED",
        }
    }
}

impl std::fmt::Display for DashboardEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DashboardEvent::CoinsRefreshed { count, .. } => {
                write!(f, "Coin list refreshed: {} coins", count)
            }
            DashboardEvent::FetchFailed {
                query,
                error_message,
                ..
            } => {
                write!(f, "Fetch failed for {}: {}", query, error_message)
            }
            DashboardEvent::FavouritesChanged {
                coin_id,
                favourited,
                ..
            } => {
                if *favourited {
                    write!(f, "Favourited {}", coin_id)
                } else {
                    write!(f, "Unfavourited {}", coin_id)
                }
            }
        }
    }
}

/// Overall dashboard health status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum HealthStatus {
    /// Fresh coin data is available
    Healthy,
    /// Data is available but stale
    Degraded,
    /// No coin data is available at all
    Unhealthy,
}

/// Health report for the dashboard data layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardHealth {
    /// Component name
    pub name: String,
    /// Component status
    pub status: HealthStatus,
    /// Optional status message
    pub message: Option<String>,
    /// Component-specific details
    pub details: std::collections::HashMap<String, serde_json::Value>,
    /// Last checked timestamp
    pub last_checked: DateTime<Utc>,
}

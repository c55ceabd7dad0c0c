//! Provider abstraction for fetching market data from external APIs

use crate::{
    error::ApiError,
    types::{Coin, CoinDetail, SearchResult},
};
use async_trait::async_trait;

/// Trait for market-data providers
///
/// Implementations fetch coin listings, per-coin detail, and search results
/// from a remote source. Every operation classifies its failures into the
/// [`ApiError`] taxonomy; raw transport errors never cross this boundary.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Fetches one page of coins ordered by descending market capitalization
    ///
    /// # Arguments
    /// * `page` - 1-based page number; each page holds 100 coins
    async fn list_coins(&self, page: u32) -> Result<Vec<Coin>, ApiError>;

    /// Fetches full detail for a single coin
    ///
    /// Fails with `ApiError::InvalidArgument` when `id` is empty, without
    /// issuing a network call.
    async fn coin_detail(&self, id: &str) -> Result<CoinDetail, ApiError>;

    /// Searches coins by name or symbol
    ///
    /// An empty query returns an empty result without a network call.
    async fn search_coins(&self, query: &str) -> Result<Vec<SearchResult>, ApiError>;

    /// Returns the name of this provider
    fn provider_name(&self) -> &'static str;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Builds a list-row coin for tests
    pub fn test_coin(id: &str, rank: u32, price: f64, change_24h: f64) -> Coin {
        Coin {
            id: id.to_string(),
            symbol: id.chars().take(3).collect(),
            name: {
                let mut name = id.to_string();
                if let Some(first) = name.get_mut(0..1) {
                    first.make_ascii_uppercase();
                }
                name
            },
            image: format!("https://assets.example/{}.png", id),
            current_price: price,
            market_cap: price * 1_000_000.0,
            market_cap_rank: rank,
            price_change_percentage_24h: change_24h,
            total_volume: price * 50_000.0,
        }
    }

    /// Mock provider for testing
    ///
    /// Scripted per-operation responses plus call counters, so tests can
    /// assert how many network attempts a policy actually made.
    pub struct MockProvider {
        coins: Mutex<Result<Vec<Coin>, ApiError>>,
        details: Mutex<HashMap<String, Result<CoinDetail, ApiError>>>,
        search: Mutex<Result<Vec<SearchResult>, ApiError>>,
        list_calls: Mutex<usize>,
        detail_calls: Mutex<usize>,
        search_calls: Mutex<usize>,
    }

    impl Default for MockProvider {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MockProvider {
        pub fn new() -> Self {
            Self {
                coins: Mutex::new(Ok(Vec::new())),
                details: Mutex::new(HashMap::new()),
                search: Mutex::new(Ok(Vec::new())),
                list_calls: Mutex::new(0),
                detail_calls: Mutex::new(0),
                search_calls: Mutex::new(0),
            }
        }

        pub fn set_coins(&self, coins: Vec<Coin>) {
            *self.coins.lock().unwrap() = Ok(coins);
        }

        pub fn set_coins_error(&self, error: ApiError) {
            *self.coins.lock().unwrap() = Err(error);
        }

        pub fn set_detail(&self, id: &str, detail: CoinDetail) {
            self.details
                .lock()
                .unwrap()
                .insert(id.to_string(), Ok(detail));
        }

        pub fn set_detail_error(&self, id: &str, error: ApiError) {
            self.details
                .lock()
                .unwrap()
                .insert(id.to_string(), Err(error));
        }

        pub fn set_search_results(&self, results: Vec<SearchResult>) {
            *self.search.lock().unwrap() = Ok(results);
        }

        pub fn list_calls(&self) -> usize {
            *self.list_calls.lock().unwrap()
        }

        pub fn detail_calls(&self) -> usize {
            *self.detail_calls.lock().unwrap()
        }

        pub fn search_calls(&self) -> usize {
            *self.search_calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl MarketDataProvider for MockProvider {
        async fn list_coins(&self, _page: u32) -> Result<Vec<Coin>, ApiError> {
            *self.list_calls.lock().unwrap() += 1;
            self.coins.lock().unwrap().clone()
        }

        async fn coin_detail(&self, id: &str) -> Result<CoinDetail, ApiError> {
            if id.is_empty() {
                return Err(ApiError::invalid_argument("Coin ID is required"));
            }
            *self.detail_calls.lock().unwrap() += 1;
            self.details
                .lock()
                .unwrap()
                .get(id)
                .cloned()
                .unwrap_or_else(|| Err(ApiError::not_found(id)))
        }

        async fn search_coins(&self, query: &str) -> Result<Vec<SearchResult>, ApiError> {
            if query.is_empty() {
                return Ok(Vec::new());
            }
            *self.search_calls.lock().unwrap() += 1;
            self.search.lock().unwrap().clone()
        }

        fn provider_name(&self) -> &'static str {
            "mock"
        }
    }
}

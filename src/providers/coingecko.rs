//! CoinGecko market-data provider implementation

use crate::{
    constants::{COINGECKO_API_URL, MARKETS_PAGE_SIZE, REQUEST_TIMEOUT_SECS, USER_AGENT},
    error::ApiError,
    provider::MarketDataProvider,
    types::{Coin, CoinDetail, SearchResult},
};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// CoinGecko `/coins/{id}` response, before flattening
#[derive(Debug, Deserialize)]
struct RawCoinDetail {
    id: String,
    symbol: String,
    name: String,
    image: ImageField,
    #[serde(default)]
    description: Description,
    market_cap_rank: Option<u32>,
    market_data: RawMarketData,
}

#[derive(Debug, Default, Deserialize)]
struct Description {
    #[serde(default)]
    en: String,
}

/// The `image` field arrives either as a plain URL string or as an object
/// of sizes. Both shapes normalize to one canonical URL at the decode
/// boundary so the rest of the system only ever sees a string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ImageField {
    Url(String),
    Sizes {
        #[serde(default)]
        thumb: Option<String>,
        #[serde(default)]
        small: Option<String>,
        #[serde(default)]
        large: Option<String>,
    },
}

impl ImageField {
    fn into_url(self) -> String {
        match self {
            ImageField::Url(url) => url,
            ImageField::Sizes {
                thumb,
                small,
                large,
            } => large.or(small).or(thumb).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawMarketData {
    current_price: UsdValue,
    market_cap: UsdValue,
    total_volume: UsdValue,
    #[serde(default)]
    price_change_percentage_24h: f64,
    #[serde(default)]
    price_change_percentage_7d: f64,
    #[serde(default)]
    price_change_percentage_30d: f64,
    #[serde(default)]
    price_change_percentage_1y: f64,
}

#[derive(Debug, Default, Deserialize)]
struct UsdValue {
    #[serde(default)]
    usd: f64,
}

impl RawCoinDetail {
    /// Flattens the nested `market_data` sub-object into top-level fields
    fn flatten(self) -> CoinDetail {
        CoinDetail {
            id: self.id,
            symbol: self.symbol,
            name: self.name,
            image: self.image.into_url(),
            current_price: self.market_data.current_price.usd,
            market_cap: self.market_data.market_cap.usd,
            market_cap_rank: self.market_cap_rank,
            total_volume: self.market_data.total_volume.usd,
            price_change_percentage_24h: self.market_data.price_change_percentage_24h,
            price_change_percentage_7d: self.market_data.price_change_percentage_7d,
            price_change_percentage_30d: self.market_data.price_change_percentage_30d,
            price_change_percentage_1y: self.market_data.price_change_percentage_1y,
            description: self.description.en,
        }
    }
}

/// CoinGecko `/search` response
#[derive(Debug, Deserialize)]
struct SearchResponse {
    coins: Vec<SearchResult>,
}

/// CoinGecko market-data provider
pub struct CoinGeckoProvider {
    client: Client,
}

impl CoinGeckoProvider {
    /// Creates a new CoinGecko provider
    pub fn new() -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ApiError::unknown(e.to_string()))?;

        Ok(Self { client })
    }

    /// Builds a GET request with its parameters attached via reqwest's
    /// query serializer, which percent-encodes user-supplied values.
    /// Interpolating them into the URL string would let `&` or `#` in a
    /// search term reshape the request.
    fn build_request(&self, url: &str, params: &[(&str, &str)]) -> reqwest::RequestBuilder {
        self.client
            .get(url)
            .query(params)
            .header("Accept", "application/json")
    }

    /// Issues a GET request and classifies every failure into the
    /// [`ApiError`] taxonomy. This is the single place transport errors
    /// are interpreted; all three operations go through it.
    async fn get_json(
        &self,
        url: &str,
        params: &[(&str, &str)],
    ) -> Result<serde_json::Value, ApiError> {
        tracing::debug!(url, "Fetching from CoinGecko");

        let response = self
            .build_request(url, params)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status.as_u16(), url, &body));
        }

        let body = response.text().await.map_err(classify_transport_error)?;
        serde_json::from_str(&body)
            .map_err(|e| ApiError::invalid_response(format!("Malformed JSON body: {}", e)))
    }
}

/// Maps reqwest failures onto the error taxonomy
fn classify_transport_error(e: reqwest::Error) -> ApiError {
    if e.is_timeout() {
        ApiError::Timeout
    } else {
        ApiError::unknown(e.to_string())
    }
}

/// Maps a non-2xx status onto the error taxonomy
fn classify_status(status: u16, url: &str, body: &str) -> ApiError {
    match status {
        429 => ApiError::RateLimited,
        404 => ApiError::not_found(url.to_string()),
        _ => ApiError::unknown(format!("HTTP {}: {}", status, body)),
    }
}

/// Coin ids appear as a path segment; anything that could terminate or
/// reshape the path is rejected rather than encoded, since no real
/// CoinGecko id contains such characters.
fn is_valid_coin_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| !c.is_whitespace() && !matches!(c, '/' | '?' | '#' | '%' | '&'))
}

#[async_trait]
impl MarketDataProvider for CoinGeckoProvider {
    async fn list_coins(&self, page: u32) -> Result<Vec<Coin>, ApiError> {
        let url = format!("{}/coins/markets", COINGECKO_API_URL);
        let per_page = MARKETS_PAGE_SIZE.to_string();
        let page_param = page.to_string();
        let params = [
            ("vs_currency", "usd"),
            ("order", "market_cap_desc"),
            ("per_page", per_page.as_str()),
            ("page", page_param.as_str()),
            ("sparkline", "false"),
        ];

        let payload = self.get_json(&url, &params).await?;
        if !payload.is_array() {
            return Err(ApiError::invalid_response(
                "Expected a JSON array of coins",
            ));
        }

        let coins: Vec<Coin> = serde_json::from_value(payload)
            .map_err(|e| ApiError::invalid_response(format!("Malformed coin row: {}", e)))?;

        tracing::debug!(count = coins.len(), page, "Fetched coin list");
        Ok(coins)
    }

    async fn coin_detail(&self, id: &str) -> Result<CoinDetail, ApiError> {
        if id.is_empty() {
            return Err(ApiError::invalid_argument("Coin ID is required"));
        }
        if !is_valid_coin_id(id) {
            return Err(ApiError::invalid_argument(format!(
                "Malformed coin ID: {}",
                id
            )));
        }

        let url = format!("{}/coins/{}", COINGECKO_API_URL, id);
        let params = [
            ("localization", "false"),
            ("tickers", "false"),
            ("market_data", "true"),
            ("community_data", "false"),
            ("developer_data", "false"),
            ("sparkline", "false"),
        ];

        let payload = self.get_json(&url, &params).await?;
        if !payload.is_object() {
            return Err(ApiError::invalid_response(
                "Expected a JSON object for coin detail",
            ));
        }

        let raw: RawCoinDetail = serde_json::from_value(payload)
            .map_err(|e| ApiError::invalid_response(format!("Malformed coin detail: {}", e)))?;

        Ok(raw.flatten())
    }

    async fn search_coins(&self, query: &str) -> Result<Vec<SearchResult>, ApiError> {
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/search", COINGECKO_API_URL);

        let payload = self.get_json(&url, &[("query", query)]).await?;
        let response: SearchResponse = serde_json::from_value(payload).map_err(|e| {
            ApiError::invalid_response(format!("Search payload lacks a coins array: {}", e))
        })?;

        Ok(response.coins)
    }

    fn provider_name(&self) -> &'static str {
        "coingecko"
    }
}

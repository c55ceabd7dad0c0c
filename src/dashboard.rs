//! Dashboard service wiring the client, caches, and stores together
//!
//! This is the single entry point the render surface talks to: it owns the
//! query caches, the favourites and session stores, and the filter state,
//! and it runs the background task that keeps the coin list current.

use crate::{
    cache::{CachePolicy, QueryCache, QuerySnapshot},
    constants::LIST_REFRESH_INTERVAL_SECS,
    error::{ApiError, StorageError},
    favourites::FavouritesStore,
    metrics::{MetricsCollector, ProviderMetrics},
    provider::MarketDataProvider,
    session::SessionStore,
    storage::KeyValueStorage,
    types::{
        Coin, CoinDetail, DashboardEvent, DashboardHealth, HealthStatus, SearchResult, Theme,
    },
    view::{derive_display_list, ListFilter, SortKey},
};
use std::collections::HashSet;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tokio::time::sleep;
use uuid::Uuid;

/// Buffered events per subscriber before lagging
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// The page the dashboard lists and keeps refreshed
const DEFAULT_PAGE: u32 = 1;

/// Dashboard data layer
///
/// Construct one per application, hand it an [`Arc`], and inject it into
/// whatever renders the UI. All shared state is owned here; there are no
/// ambient globals.
pub struct Dashboard {
    provider: Arc<dyn MarketDataProvider>,
    coins: QueryCache<u32, Vec<Coin>>,
    details: QueryCache<String, CoinDetail>,
    searches: QueryCache<String, Vec<SearchResult>>,
    favourites: FavouritesStore,
    session: SessionStore,
    filter: RwLock<ListFilter>,
    metrics: Arc<MetricsCollector>,
    events: broadcast::Sender<DashboardEvent>,
}

impl Dashboard {
    /// Creates a dashboard over `provider`, rehydrating persisted state
    /// from `storage`
    pub fn new(provider: Arc<dyn MarketDataProvider>, storage: Arc<dyn KeyValueStorage>) -> Self {
        Self::with_cache_policy(provider, storage, CachePolicy::default())
    }

    /// Creates a dashboard with an explicit cache policy (shorter windows
    /// for tests)
    pub fn with_cache_policy(
        provider: Arc<dyn MarketDataProvider>,
        storage: Arc<dyn KeyValueStorage>,
        policy: CachePolicy,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let metrics = Arc::new(MetricsCollector::new(provider.provider_name()));
        let favourites = FavouritesStore::with_event_sender(storage.clone(), events.clone());
        let session = SessionStore::new(storage);

        Self {
            provider,
            coins: QueryCache::with_policy(policy),
            details: QueryCache::with_policy(policy),
            searches: QueryCache::with_policy(policy),
            favourites,
            session,
            filter: RwLock::new(ListFilter::default()),
            metrics,
            events,
        }
    }

    /// Spawns the periodic refresh: refetches the coin list every two
    /// minutes regardless of staleness and evicts idle cache entries.
    pub fn start_background_task(self: Arc<Self>) {
        let dashboard = self;
        tokio::spawn(async move {
            tracing::info!(
                refresh_interval_secs = LIST_REFRESH_INTERVAL_SECS,
                "Starting coin list refresh task"
            );

            loop {
                if let Err(e) = dashboard.refresh_now().await {
                    tracing::warn!(error = %e, "Periodic coin list refresh failed");
                }
                dashboard.evict_idle_entries();
                sleep(Duration::from_secs(LIST_REFRESH_INTERVAL_SECS)).await;
            }
        });
    }

    fn list_fetch(&self, page: u32) -> impl Fn() -> FetchFuture<Vec<Coin>> + Send + Sync + 'static {
        let provider = self.provider.clone();
        let metrics = self.metrics.clone();
        move || {
            let provider = provider.clone();
            let metrics = metrics.clone();
            Box::pin(async move {
                let start = Instant::now();
                let result = provider.list_coins(page).await;
                metrics.record_request(start.elapsed(), result.is_ok());
                result
            }) as FetchFuture<Vec<Coin>>
        }
    }

    /// Current snapshot of the first coin list page, fetching when needed
    pub async fn coins(&self) -> QuerySnapshot<Vec<Coin>> {
        self.coins_page(DEFAULT_PAGE).await
    }

    /// Current snapshot of an arbitrary coin list page
    pub async fn coins_page(&self, page: u32) -> QuerySnapshot<Vec<Coin>> {
        self.coins.fetch(page, self.list_fetch(page)).await
    }

    /// Current snapshot of a coin's detail, fetching when needed.
    ///
    /// An empty id fails with `InvalidArgument` before the cache or the
    /// network is touched.
    pub async fn coin_detail(&self, id: &str) -> QuerySnapshot<CoinDetail> {
        if id.is_empty() {
            return QuerySnapshot {
                data: None,
                is_loading: false,
                is_error: true,
                error: Some(ApiError::invalid_argument("Coin ID is required")),
            };
        }

        let provider = self.provider.clone();
        let metrics = self.metrics.clone();
        let coin_id = id.to_string();
        self.details
            .fetch(id.to_string(), move || {
                let provider = provider.clone();
                let metrics = metrics.clone();
                let coin_id = coin_id.clone();
                Box::pin(async move {
                    let start = Instant::now();
                    let result = provider.coin_detail(&coin_id).await;
                    metrics.record_request(start.elapsed(), result.is_ok());
                    result
                }) as FetchFuture<CoinDetail>
            })
            .await
    }

    /// Search results for `query`. An empty query yields an empty result
    /// immediately, with no network call and no cache entry.
    pub async fn search(&self, query: &str) -> QuerySnapshot<Vec<SearchResult>> {
        if query.is_empty() {
            return QuerySnapshot {
                data: Some(Vec::new()),
                is_loading: false,
                is_error: false,
                error: None,
            };
        }

        let provider = self.provider.clone();
        let metrics = self.metrics.clone();
        let term = query.to_string();
        self.searches
            .fetch(query.to_string(), move || {
                let provider = provider.clone();
                let metrics = metrics.clone();
                let term = term.clone();
                Box::pin(async move {
                    let start = Instant::now();
                    let result = provider.search_coins(&term).await;
                    metrics.record_request(start.elapsed(), result.is_ok());
                    result
                }) as FetchFuture<Vec<SearchResult>>
            })
            .await
    }

    /// Forces an immediate coin list refetch, bypassing the freshness
    /// window, and broadcasts the outcome
    pub async fn refresh_now(&self) -> Result<usize, ApiError> {
        let snapshot = self
            .coins
            .refetch(DEFAULT_PAGE, self.list_fetch(DEFAULT_PAGE))
            .await;

        match (snapshot.data, snapshot.error) {
            (Some(coins), None) => {
                let count = coins.len();
                let _ = self.events.send(DashboardEvent::CoinsRefreshed {
                    id: Uuid::new_v4(),
                    count,
                    timestamp: chrono::Utc::now(),
                });
                Ok(count)
            }
            (_, Some(error)) => {
                let _ = self.events.send(DashboardEvent::FetchFailed {
                    id: Uuid::new_v4(),
                    query: "coins".to_string(),
                    error_message: error.to_string(),
                    timestamp: chrono::Utc::now(),
                });
                Err(error)
            }
            (stale, None) => {
                // refetch always applies a result; reaching here means the
                // last-known data survived an impossible state.
                Ok(stale.map(|c| c.len()).unwrap_or(0))
            }
        }
    }

    /// Drops cache entries that have gone unused past the idle bound
    pub fn evict_idle_entries(&self) {
        self.coins.evict_idle();
        self.details.evict_idle();
        self.searches.evict_idle();
    }

    /// The filtered, sorted display list derived from the cached coin
    /// collection and the current filter state. Does not fetch.
    pub fn display_list(&self) -> Vec<Coin> {
        let snapshot = self.coins.snapshot(&DEFAULT_PAGE);
        let Some(coins) = snapshot.data else {
            return Vec::new();
        };
        let filter = self.filter.read().unwrap().clone();
        derive_display_list(&coins, &filter, &self.favourites.list())
    }

    /// Current filter state
    pub fn filter(&self) -> ListFilter {
        self.filter.read().unwrap().clone()
    }

    /// Sets the search text
    pub fn set_search(&self, search: &str) {
        self.filter.write().unwrap().search = search.to_string();
    }

    /// Sets the sort key
    pub fn set_sort(&self, sort: SortKey) {
        self.filter.write().unwrap().sort = sort;
    }

    /// Sets the favourites-only flag
    pub fn set_favourites_only(&self, favourites_only: bool) {
        self.filter.write().unwrap().favourites_only = favourites_only;
    }

    /// Flips favourite membership for `id`
    pub fn toggle_favourite(&self, id: &str) -> Result<bool, StorageError> {
        self.favourites.toggle(id)
    }

    /// Whether `id` is currently favourited
    pub fn is_favourite(&self, id: &str) -> bool {
        self.favourites.is_favourite(id)
    }

    /// Snapshot of the favourites set
    pub fn favourites(&self) -> HashSet<String> {
        self.favourites.list()
    }

    /// Current display theme
    pub fn theme(&self) -> Theme {
        self.session.theme()
    }

    /// Flips between light and dark, returning the new theme
    pub fn toggle_theme(&self) -> Result<Theme, StorageError> {
        self.session.toggle_theme()
    }

    /// The route the user last visited, if any
    pub fn last_visited_path(&self) -> Option<String> {
        self.session.last_visited_path()
    }

    /// Records and persists a route visit
    pub fn record_visit(&self, path: &str) -> Result<(), StorageError> {
        self.session.record_visit(path)
    }

    /// Subscribes to dashboard events (list refreshes, fetch failures,
    /// favourites changes)
    pub fn subscribe(&self) -> broadcast::Receiver<DashboardEvent> {
        self.events.subscribe()
    }

    /// Returns the name of the configured provider
    pub fn provider_name(&self) -> &str {
        self.provider.provider_name()
    }

    /// Provider request metrics
    pub fn metrics(&self) -> ProviderMetrics {
        self.metrics.get_metrics()
    }

    /// Health of the data layer, judged from the cached coin list
    pub fn health_check(&self) -> DashboardHealth {
        let snapshot = self.coins.snapshot(&DEFAULT_PAGE);
        let cached_coins = snapshot.data.as_ref().map(|c| c.len()).unwrap_or(0);
        let stale = self.coins.is_stale(&DEFAULT_PAGE);

        let mut details = std::collections::HashMap::new();
        details.insert(
            "cached_coins".to_string(),
            serde_json::json!(cached_coins),
        );
        details.insert(
            "provider_name".to_string(),
            serde_json::json!(self.provider_name()),
        );
        details.insert("stale".to_string(), serde_json::json!(stale));
        details.insert(
            "favourites".to_string(),
            serde_json::json!(self.favourites.list().len()),
        );

        let status = if snapshot.data.is_none() {
            HealthStatus::Unhealthy
        } else if stale {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        let message = match status {
            HealthStatus::Healthy => "Coin data is fresh".to_string(),
            HealthStatus::Degraded => "Coin data is stale, awaiting refresh".to_string(),
            HealthStatus::Unhealthy => "No coin data available".to_string(),
        };

        DashboardHealth {
            name: "dashboard".to_string(),
            status,
            message: Some(message),
            details,
            last_checked: chrono::Utc::now(),
        }
    }
}

type FetchFuture<T> =
    std::pin::Pin<Box<dyn std::future::Future<Output = Result<T, ApiError>> + Send>>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::mock::{test_coin, MockProvider};
    use crate::storage::MemoryStorage;

    fn fast_policy() -> CachePolicy {
        CachePolicy {
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(1),
            ..Default::default()
        }
    }

    fn dashboard_with(provider: Arc<MockProvider>) -> Dashboard {
        Dashboard::with_cache_policy(provider, Arc::new(MemoryStorage::new()), fast_policy())
    }

    fn ranked_coins() -> Vec<Coin> {
        vec![
            test_coin("bitcoin", 1, 67000.0, 2.1),
            test_coin("ethereum", 2, 3100.0, -1.4),
            test_coin("solana", 3, 145.0, 5.6),
        ]
    }

    #[tokio::test]
    async fn empty_detail_id_fails_without_a_provider_call() {
        let provider = Arc::new(MockProvider::new());
        let dashboard = dashboard_with(provider.clone());

        let snapshot = dashboard.coin_detail("").await;
        assert!(snapshot.is_error);
        assert!(matches!(snapshot.error, Some(ApiError::InvalidArgument(_))));
        assert_eq!(provider.detail_calls(), 0);
    }

    #[tokio::test]
    async fn coin_list_is_served_from_cache_within_the_freshness_window() {
        let provider = Arc::new(MockProvider::new());
        provider.set_coins(ranked_coins());
        let dashboard = dashboard_with(provider.clone());

        let first = dashboard.coins().await;
        let second = dashboard.coins().await;

        assert_eq!(first.data.unwrap().len(), 3);
        assert_eq!(second.data.unwrap().len(), 3);
        assert_eq!(provider.list_calls(), 1);
    }

    #[tokio::test]
    async fn unknown_coin_detail_is_not_retried() {
        let provider = Arc::new(MockProvider::new());
        let dashboard = dashboard_with(provider.clone());

        let snapshot = dashboard.coin_detail("no-such-coin").await;
        assert!(matches!(snapshot.error, Some(ApiError::NotFound(_))));
        assert_eq!(provider.detail_calls(), 1);
    }

    #[tokio::test]
    async fn rate_limited_list_fetch_uses_all_three_attempts() {
        let provider = Arc::new(MockProvider::new());
        provider.set_coins_error(ApiError::RateLimited);
        let dashboard = dashboard_with(provider.clone());

        let snapshot = dashboard.coins().await;
        assert_eq!(snapshot.error, Some(ApiError::RateLimited));
        assert_eq!(provider.list_calls(), 3);
    }

    #[tokio::test]
    async fn empty_search_returns_empty_without_a_provider_call() {
        let provider = Arc::new(MockProvider::new());
        let dashboard = dashboard_with(provider.clone());

        let snapshot = dashboard.search("").await;
        assert_eq!(snapshot.data, Some(Vec::new()));
        assert!(!snapshot.is_error);
        assert_eq!(provider.search_calls(), 0);
    }

    #[tokio::test]
    async fn display_list_applies_filter_state_and_favourites() {
        let provider = Arc::new(MockProvider::new());
        provider.set_coins(ranked_coins());
        let dashboard = dashboard_with(provider);

        dashboard.coins().await;
        dashboard.toggle_favourite("solana").unwrap();
        dashboard.set_favourites_only(true);

        let list = dashboard.display_list();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].id, "solana");

        dashboard.set_favourites_only(false);
        dashboard.set_sort(SortKey::PriceLow);
        let list = dashboard.display_list();
        let ids: Vec<&str> = list.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["solana", "ethereum", "bitcoin"]);
    }

    #[tokio::test]
    async fn refresh_now_refetches_and_broadcasts() {
        let provider = Arc::new(MockProvider::new());
        provider.set_coins(ranked_coins());
        let dashboard = dashboard_with(provider.clone());
        let mut events = dashboard.subscribe();

        dashboard.coins().await;
        let count = dashboard.refresh_now().await.unwrap();

        assert_eq!(count, 3);
        assert_eq!(provider.list_calls(), 2);
        match events.recv().await.unwrap() {
            DashboardEvent::CoinsRefreshed { count, .. } => assert_eq!(count, 3),
            other => panic!("Unexpected event: {}", other),
        }
    }

    #[tokio::test]
    async fn failed_refresh_broadcasts_a_fetch_failure() {
        let provider = Arc::new(MockProvider::new());
        provider.set_coins_error(ApiError::Timeout);
        let dashboard = dashboard_with(provider);
        let mut events = dashboard.subscribe();

        let result = dashboard.refresh_now().await;
        assert_eq!(result.unwrap_err(), ApiError::Timeout);

        match events.recv().await.unwrap() {
            DashboardEvent::FetchFailed { query, .. } => assert_eq!(query, "coins"),
            other => panic!("Unexpected event: {}", other),
        }
    }

    #[tokio::test]
    async fn health_reflects_cache_presence() {
        let provider = Arc::new(MockProvider::new());
        provider.set_coins(ranked_coins());
        let dashboard = dashboard_with(provider);

        assert!(matches!(
            dashboard.health_check().status,
            HealthStatus::Unhealthy
        ));

        dashboard.coins().await;
        assert!(matches!(
            dashboard.health_check().status,
            HealthStatus::Healthy
        ));
    }

    #[tokio::test]
    async fn session_state_round_trips_through_the_dashboard() {
        let provider = Arc::new(MockProvider::new());
        let dashboard = dashboard_with(provider);

        assert_eq!(dashboard.theme(), Theme::Light);
        assert_eq!(dashboard.toggle_theme().unwrap(), Theme::Dark);

        dashboard.record_visit("/coin/bitcoin").unwrap();
        assert_eq!(
            dashboard.last_visited_path().as_deref(),
            Some("/coin/bitcoin")
        );
    }

    #[tokio::test]
    async fn metrics_count_provider_requests() {
        let provider = Arc::new(MockProvider::new());
        provider.set_coins(ranked_coins());
        let dashboard = dashboard_with(provider);

        dashboard.coins().await;
        let metrics = dashboard.metrics();
        assert_eq!(metrics.provider_name, "mock");
        assert_eq!(metrics.total_requests, 1);
        assert_eq!(metrics.failed_requests, 0);
    }
}

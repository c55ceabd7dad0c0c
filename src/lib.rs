//! # CryptoView Core
//!
//! Data layer for a cryptocurrency price dashboard backed by the CoinGecko
//! API: coin listings, per-coin detail, and search, behind a query cache
//! with stale-while-revalidate semantics, plus persisted favourites and
//! session state (theme, last visited route).
//!
//! ## Important: This crate owns no rendering
//!
//! The render surface consumes [`QuerySnapshot`]s, the derived display
//! list, and [`DashboardEvent`]s, and calls back into the [`Dashboard`]
//! on user interaction. Everything visual lives outside this crate.
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use cryptoview_core::{CoinGeckoProvider, Dashboard, JsonFileStorage, SortKey};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = Arc::new(CoinGeckoProvider::new()?);
//! let storage = Arc::new(JsonFileStorage::open("cryptoview-state.json")?);
//!
//! let dashboard = Arc::new(Dashboard::new(provider, storage));
//! dashboard.clone().start_background_task();
//!
//! // List the top coins
//! let snapshot = dashboard.coins().await;
//! if let Some(coins) = &snapshot.data {
//!     for coin in coins.iter().take(10) {
//!         println!("#{} {}: ${:.2}", coin.market_cap_rank, coin.name, coin.current_price);
//!     }
//! }
//!
//! // Narrow and reorder the display list
//! dashboard.set_search("bit");
//! dashboard.set_sort(SortKey::PriceHigh);
//! dashboard.toggle_favourite("bitcoin")?;
//! for coin in dashboard.display_list() {
//!     println!("{} ({})", coin.name, coin.symbol);
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod constants;
pub mod dashboard;
pub mod error;
pub mod favourites;
pub mod metrics;
pub mod provider;
pub mod providers;
pub mod session;
pub mod storage;
pub mod types;
pub mod view;

// Re-export commonly used types
pub use cache::{CachePolicy, QueryCache, QuerySnapshot};
pub use dashboard::Dashboard;
pub use error::{ApiError, StorageError};
pub use favourites::FavouritesStore;
pub use metrics::ProviderMetrics;
pub use provider::MarketDataProvider;
pub use providers::CoinGeckoProvider;
pub use session::SessionStore;
pub use storage::{JsonFileStorage, KeyValueStorage, MemoryStorage};
pub use types::{Coin, CoinDetail, DashboardEvent, DashboardHealth, HealthStatus, SearchResult, Theme};
pub use view::{derive_display_list, ListFilter, SortKey};

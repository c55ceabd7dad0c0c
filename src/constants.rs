//! Constants for the CryptoView data layer
//!
//! All configuration is centralized here. No runtime configuration file is
//! used - the system operates with these compile-time constants.

/// CoinGecko API base URL
pub const COINGECKO_API_URL: &str = "https://api.coingecko.com/api/v3";

/// Number of coins fetched per market page
pub const MARKETS_PAGE_SIZE: u32 = 100;

/// HTTP request timeout (in seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 15;

/// How long cached query data stays fresh (in seconds)
pub const STALE_AFTER_SECS: u64 = 30;

/// How often the coin list is refetched regardless of staleness (in seconds)
pub const LIST_REFRESH_INTERVAL_SECS: u64 = 120;

/// Cache entries untouched for this long are evicted (in seconds)
pub const CACHE_IDLE_EVICT_SECS: u64 = 300;

/// Maximum number of attempts for a retryable request
pub const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Initial backoff delay between retries (in milliseconds)
pub const INITIAL_BACKOFF_MS: u64 = 1000;

/// Maximum backoff delay between retries (in milliseconds)
pub const MAX_BACKOFF_MS: u64 = 30000;

/// User agent for HTTP requests
pub const USER_AGENT: &str = "cryptoview-core/0.1.0";

/// Storage key for the persisted favourites list
pub const FAVOURITES_STORAGE_KEY: &str = "favouriteCoins";

/// Storage key for the persisted theme choice
pub const THEME_STORAGE_KEY: &str = "colorMode";

/// Storage key for the last visited route
pub const LAST_PATH_STORAGE_KEY: &str = "lastVisitedPath";

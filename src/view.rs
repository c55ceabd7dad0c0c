//! Pure derivation of the display list from the cached coin collection
//!
//! Filtering and sorting never touch the network or the cache; given the
//! same inputs they produce the same output, which is what makes the list
//! behavior testable in isolation.

use crate::types::Coin;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;

/// Sort order for the coin list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    /// Ascending by market-cap rank
    #[default]
    #[serde(rename = "market_cap_rank")]
    Rank,
    /// Price, high to low
    PriceHigh,
    /// Price, low to high
    PriceLow,
    /// 24h change, high to low
    ChangeHigh,
    /// 24h change, low to high
    ChangeLow,
}

impl SortKey {
    fn compare(&self, a: &Coin, b: &Coin) -> Ordering {
        match self {
            SortKey::Rank => a.market_cap_rank.cmp(&b.market_cap_rank),
            SortKey::PriceHigh => b.current_price.total_cmp(&a.current_price),
            SortKey::PriceLow => a.current_price.total_cmp(&b.current_price),
            SortKey::ChangeHigh => b
                .price_change_percentage_24h
                .total_cmp(&a.price_change_percentage_24h),
            SortKey::ChangeLow => a
                .price_change_percentage_24h
                .total_cmp(&b.price_change_percentage_24h),
        }
    }
}

/// Current search text, sort key, and favourites-only flag
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListFilter {
    /// Case-insensitive substring matched against name or symbol;
    /// empty matches every coin
    pub search: String,
    pub sort: SortKey,
    pub favourites_only: bool,
}

fn matches_search(coin: &Coin, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    coin.name.to_lowercase().contains(needle) || coin.symbol.to_lowercase().contains(needle)
}

/// Produces the ordered, filtered display list.
///
/// The sort is stable: coins with equal keys keep their relative order from
/// the source collection.
pub fn derive_display_list(
    coins: &[Coin],
    filter: &ListFilter,
    favourites: &HashSet<String>,
) -> Vec<Coin> {
    let needle = filter.search.to_lowercase();

    let mut list: Vec<Coin> = coins
        .iter()
        .filter(|coin| matches_search(coin, &needle))
        .filter(|coin| !filter.favourites_only || favourites.contains(&coin.id))
        .cloned()
        .collect();

    list.sort_by(|a, b| filter.sort.compare(a, b));
    list
}

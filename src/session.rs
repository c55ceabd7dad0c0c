//! Persisted session state: display theme and last visited route
//!
//! A reload restores the user to the theme and page they left off on.

use crate::{
    constants::{LAST_PATH_STORAGE_KEY, THEME_STORAGE_KEY},
    error::StorageError,
    storage::KeyValueStorage,
    types::Theme,
};
use std::sync::{Arc, RwLock};

/// Store for per-user session state
pub struct SessionStore {
    storage: Arc<dyn KeyValueStorage>,
    theme: RwLock<Theme>,
    last_path: RwLock<Option<String>>,
}

impl SessionStore {
    /// Creates a store rehydrated from persisted storage
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        let theme = storage
            .get(THEME_STORAGE_KEY)
            .map(|s| Theme::from_str_or_default(&s))
            .unwrap_or_default();
        let last_path = storage.get(LAST_PATH_STORAGE_KEY);

        Self {
            storage,
            theme: RwLock::new(theme),
            last_path: RwLock::new(last_path),
        }
    }

    /// Current display theme
    pub fn theme(&self) -> Theme {
        *self.theme.read().unwrap()
    }

    /// Sets and persists the display theme
    pub fn set_theme(&self, theme: Theme) -> Result<(), StorageError> {
        *self.theme.write().unwrap() = theme;
        self.storage.set(THEME_STORAGE_KEY, theme.as_str())
    }

    /// Flips between light and dark, returning the new theme
    pub fn toggle_theme(&self) -> Result<Theme, StorageError> {
        let next = self.theme().toggled();
        self.set_theme(next)?;
        Ok(next)
    }

    /// The route the user last visited, if any
    pub fn last_visited_path(&self) -> Option<String> {
        self.last_path.read().unwrap().clone()
    }

    /// Records and persists a route visit
    pub fn record_visit(&self, path: &str) -> Result<(), StorageError> {
        *self.last_path.write().unwrap() = Some(path.to_string());
        self.storage.set(LAST_PATH_STORAGE_KEY, path)
    }
}

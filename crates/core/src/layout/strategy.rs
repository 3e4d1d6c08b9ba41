//! Pluggable placement strategies.
//!
//! A strategy decides which library subfolder a single video file belongs
//! in. Strategies are registered by name at startup; `library.strategy`
//! picks one.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::patterns::classify_name;
use super::{FileFacts, LayoutError, TargetFolder};

/// Decides where a file goes in the library.
pub trait LayoutStrategy: Send + Sync {
    /// Registry name.
    fn name(&self) -> &str;

    fn place(&self, facts: &FileFacts) -> TargetFolder;
}

/// Jellyfin-style placement.
///
/// Movie-length files go to `Movies`. Otherwise the nearest enclosing
/// folder naming a season or specials decides, then the file name, and
/// finally `Season 01`.
#[derive(Debug, Default, Clone, Copy)]
pub struct JellyfinStrategy;

impl LayoutStrategy for JellyfinStrategy {
    fn name(&self) -> &str {
        "jellyfin"
    }

    fn place(&self, facts: &FileFacts) -> TargetFolder {
        if facts.is_movie_length() {
            return TargetFolder::Movies;
        }

        facts
            .dir_components
            .iter()
            .find_map(|dir| classify_name(dir))
            .or_else(|| classify_name(&facts.file_name))
            .unwrap_or(TargetFolder::Season(1))
    }
}

/// Simple placement: top-level files are `Season 01`, anything in a
/// subfolder is treated as an extra.
#[derive(Debug, Default, Clone, Copy)]
pub struct FlatStrategy;

impl LayoutStrategy for FlatStrategy {
    fn name(&self) -> &str {
        "flat"
    }

    fn place(&self, facts: &FileFacts) -> TargetFolder {
        if facts.is_movie_length() {
            TargetFolder::Movies
        } else if facts.in_subfolder() {
            TargetFolder::Specials
        } else {
            TargetFolder::Season(1)
        }
    }
}

/// Named layout strategies.
#[derive(Clone, Default)]
pub struct StrategyRegistry {
    strategies: BTreeMap<String, Arc<dyn LayoutStrategy>>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in `jellyfin` and `flat` strategies.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(JellyfinStrategy));
        registry.register(Arc::new(FlatStrategy));
        registry
    }

    /// Add a strategy, replacing any previous one with the same name.
    pub fn register(&mut self, strategy: Arc<dyn LayoutStrategy>) {
        self.strategies.insert(strategy.name().to_string(), strategy);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.strategies.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.strategies.keys().map(String::as_str).collect()
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<dyn LayoutStrategy>, LayoutError> {
        self.strategies
            .get(name)
            .cloned()
            .ok_or_else(|| LayoutError::UnknownStrategy(name.to_string()))
    }
}

impl std::fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyRegistry")
            .field("strategies", &self.names())
            .finish()
    }
}

/// Router configuration with explicit state tracking
///
/// Each knob records whether it was explicitly set or should fall back to
/// its default; `effective_*` accessors always return a usable value.
/// There is deliberately no environment or file layer behind this: the
/// registry is configured in code by whoever builds it.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Parameter key recognized (case-insensitively) as the quality
    /// factor in media ranges (None = use default)
    quality_key: Option<String>,

    /// Whether resolve() may cache candidate lists per (verb, uri)
    /// (None = use default)
    cache_matches: Option<bool>,
}

// Default constants for configuration parameters
const DEFAULT_QUALITY_KEY: &str = "q";
const DEFAULT_CACHE_MATCHES: bool = false;

impl RouterConfig {
    /// Creates a new `RouterConfig` with all parameters unset
    pub fn new() -> Self {
        Self {
            quality_key: None,
            cache_matches: None,
        }
    }

    // --------------------------------------------------
    // Quality Key Configuration
    // --------------------------------------------------

    /// Gets the explicitly set quality key (None if unset)
    pub fn quality_key(&self) -> Option<&str> {
        self.quality_key.as_deref()
    }

    /// Sets the quality key explicitly
    pub fn set_quality_key(&mut self, key: Option<String>) {
        self.quality_key = key;
    }

    /// Builder-style quality key override
    pub fn with_quality_key<T: Into<String>>(mut self, key: T) -> Self {
        self.quality_key = Some(key.into());
        self
    }

    /// Gets the effective quality key (always returns a value)
    pub fn effective_quality_key(&self) -> &str {
        self.quality_key.as_deref().unwrap_or(DEFAULT_QUALITY_KEY)
    }

    // --------------------------------------------------
    // Match Cache Configuration
    // --------------------------------------------------

    /// Gets the explicitly set cache toggle (None if unset)
    pub fn cache_matches(&self) -> Option<bool> {
        self.cache_matches
    }

    /// Sets the cache toggle explicitly
    pub fn set_cache_matches(&mut self, on: Option<bool>) {
        self.cache_matches = on;
    }

    /// Builder-style cache toggle
    pub fn with_cache_matches(mut self, on: bool) -> Self {
        self.cache_matches = Some(on);
        self
    }

    /// Gets the effective cache toggle (always returns a value)
    pub fn effective_cache_matches(&self) -> bool {
        self.cache_matches.unwrap_or(DEFAULT_CACHE_MATCHES)
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        RouterConfig::new()
    }
}

use crate::error::ConfigError;

const DEFAULT_STRIPE_COUNT: usize = 4;
const DEFAULT_INITIAL_BUCKETS: usize = 20;
const DEFAULT_GROWTH_FACTOR: usize = 3;
const DEFAULT_MAX_LOAD_FACTOR: f64 = 0.75;

/// Options used to create a `StripedHashSet`.
///
/// The stripe count is fixed for the lifetime of the set. The bucket count
/// starts at `initial_bucket_count` and is multiplied by `growth_factor`
/// every time the load factor exceeds `max_load_factor`.
///
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StripedSetOptions {
    stripe_count: usize,
    initial_bucket_count: usize,
    growth_factor: usize,
    max_load_factor: f64,
}

impl StripedSetOptions {
    pub fn new() -> Self {
        StripedSetOptions {
            stripe_count: DEFAULT_STRIPE_COUNT,
            initial_bucket_count: DEFAULT_INITIAL_BUCKETS,
            growth_factor: DEFAULT_GROWTH_FACTOR,
            max_load_factor: DEFAULT_MAX_LOAD_FACTOR,
        }
    }

    pub fn with_stripe_count(mut self, stripe_count: usize) -> Self {
        self.stripe_count = stripe_count;
        self
    }

    pub fn with_initial_bucket_count(mut self, initial_bucket_count: usize) -> Self {
        self.initial_bucket_count = initial_bucket_count;
        self
    }

    pub fn with_growth_factor(mut self, growth_factor: usize) -> Self {
        self.growth_factor = growth_factor;
        self
    }

    /// Elements per bucket above which an insert triggers a resize.
    pub fn with_max_load_factor(mut self, max_load_factor: f64) -> Self {
        self.max_load_factor = max_load_factor;
        self
    }

    pub fn stripe_count(&self) -> usize {
        self.stripe_count
    }

    pub fn initial_bucket_count(&self) -> usize {
        self.initial_bucket_count
    }

    pub fn growth_factor(&self) -> usize {
        self.growth_factor
    }

    pub fn max_load_factor(&self) -> f64 {
        self.max_load_factor
    }

    /// Check the options before any table is allocated.
    ///
    /// The stripe count and the bucket count are independent; the set rounds
    /// the initial bucket count up to a multiple of the stripe count itself.
    ///
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stripe_count == 0 {
            return Err(ConfigError::ZeroStripes);
        }
        if self.initial_bucket_count == 0 {
            return Err(ConfigError::ZeroBuckets);
        }
        if self.growth_factor < 2 {
            return Err(ConfigError::GrowthFactorTooSmall(self.growth_factor));
        }
        if !self.max_load_factor.is_finite() || self.max_load_factor <= 0.0 {
            return Err(ConfigError::InvalidLoadFactor(self.max_load_factor));
        }
        Ok(())
    }
}

impl Default for StripedSetOptions {
    fn default() -> Self {
        Self::new()
    }
}

use chrono::Duration;

/// Lifetimes applied when minting a token pair.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// Lifetime of the access token.
    pub access_ttl: Duration,
    /// Lifetime of the refresh token.
    pub refresh_ttl: Duration,
}

impl TokenConfig {
    /// One hour access tokens, seven day refresh tokens.
    pub fn new() -> Self {
        Self {
            access_ttl: Duration::hours(1),
            refresh_ttl: Duration::days(7),
        }
    }

    pub fn with_access_ttl(mut self, ttl: Duration) -> Self {
        self.access_ttl = ttl;
        self
    }

    pub fn with_refresh_ttl(mut self, ttl: Duration) -> Self {
        self.refresh_ttl = ttl;
        self
    }
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self::new()
    }
}

use std::time::Duration;

/// The runtime configuration shared by the store, auth, and registrar
#[derive(Debug, Clone)]
pub struct Config {
    /// How long a single store transaction may take before the store is considered unavailable
    pub transaction_timeout_in_seconds: f32,
    /// How long a sign-in session stays valid
    pub session_duration_in_days: usize,
}

impl Config {
    /// The transaction timeout as a [Duration]
    pub fn transaction_timeout(&self) -> Duration {
        Duration::try_from_secs_f32(self.transaction_timeout_in_seconds).unwrap_or(Duration::ZERO)
    }

    /// How long a session is valid for, counted from sign-in
    pub fn session_duration(&self) -> chrono::Duration {
        chrono::Duration::days(self.session_duration_in_days as i64)
    }

    /// Returns a copy of this config with a different transaction timeout
    pub fn with_transaction_timeout(mut self, seconds: f32) -> Self {
        self.transaction_timeout_in_seconds = seconds;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            // Generous enough for a slow network round trip to a remote store
            transaction_timeout_in_seconds: 10.0,
            session_duration_in_days: 7,
        }
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::Config;

    #[test]
    fn timeout_conversion() {
        let config = Config::default().with_transaction_timeout(0.25);
        assert_eq!(config.transaction_timeout(), Duration::from_millis(250));

        let broken = Config::default().with_transaction_timeout(-1.0);
        assert_eq!(broken.transaction_timeout(), Duration::ZERO);
    }

    #[test]
    fn session_duration_in_days() {
        let config = Config::default();
        assert_eq!(config.session_duration(), chrono::Duration::days(7));
    }
}

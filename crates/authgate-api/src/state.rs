//! Application state management

use crate::auth::{AuthService, JwtConfig, PasswordConfig, TokenService};
use authgate_core::config::AppConfig;
use authgate_store::{CredentialStore, TokenStore};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

/// Application state shared across handlers
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Authentication service (owns the token service)
    pub auth: AuthService,
    /// User store, kept for readiness checks
    pub users: Arc<dyn CredentialStore>,
    /// Server start time
    pub start_time: Instant,
    /// Request counter
    pub request_count: AtomicU64,
    /// Per-endpoint request metrics
    pub metrics: RwLock<HashMap<String, EndpointMetrics>>,
}

/// Request metrics for a single endpoint
#[derive(Debug, Default, Clone)]
pub struct EndpointMetrics {
    pub status_counts: HashMap<u16, u64>,
    pub total_latency_us: u64,
    pub latency_count: u64,
    pub min_latency_us: u64,
    pub max_latency_us: u64,
    pub latency_buckets: LatencyBuckets,
}

/// Latency histogram buckets
#[derive(Debug, Default, Clone)]
pub struct LatencyBuckets {
    pub under_10ms: u64,
    pub ms_10_50: u64,
    pub ms_50_100: u64,
    pub ms_100_500: u64,
    pub ms_500_1000: u64,
    pub over_1s: u64,
}

impl LatencyBuckets {
    fn record(&mut self, latency_us: u64) {
        match latency_us {
            0..=9_999 => self.under_10ms += 1,
            10_000..=49_999 => self.ms_10_50 += 1,
            50_000..=99_999 => self.ms_50_100 += 1,
            100_000..=499_999 => self.ms_100_500 += 1,
            500_000..=999_999 => self.ms_500_1000 += 1,
            _ => self.over_1s += 1,
        }
    }
}

impl AppState {
    /// Create application state over the given stores
    pub fn new(
        config: AppConfig,
        users: Arc<dyn CredentialStore>,
        tokens: Arc<dyn TokenStore>,
    ) -> Self {
        let token_service = TokenService::new(JwtConfig::from(&config.auth), tokens);
        let auth = AuthService::new(
            users.clone(),
            token_service,
            PasswordConfig::from(&config.auth),
        );

        Self {
            config,
            auth,
            users,
            start_time: Instant::now(),
            request_count: AtomicU64::new(0),
            metrics: RwLock::new(HashMap::new()),
        }
    }

    /// Get total request count
    pub fn get_request_count(&self) -> u64 {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Record one finished request
    pub async fn record_request(&self, endpoint: String, status: u16, latency_us: u64) {
        self.request_count.fetch_add(1, Ordering::SeqCst);

        let mut metrics = self.metrics.write().await;
        let entry = metrics.entry(endpoint).or_default();

        *entry.status_counts.entry(status).or_insert(0) += 1;
        if entry.latency_count == 0 || latency_us < entry.min_latency_us {
            entry.min_latency_us = latency_us;
        }
        entry.max_latency_us = entry.max_latency_us.max(latency_us);
        entry.total_latency_us += latency_us;
        entry.latency_count += 1;
        entry.latency_buckets.record(latency_us);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use authgate_store::MemoryStore;

    fn state() -> AppState {
        let store = Arc::new(MemoryStore::new());
        AppState::new(AppConfig::default(), store.clone(), store)
    }

    #[tokio::test]
    async fn test_record_request() {
        let state = state();

        state.record_request("/api/posts".into(), 200, 5_000).await;
        state.record_request("/api/posts".into(), 401, 60_000).await;
        state.record_request("/health".into(), 200, 100).await;

        assert_eq!(state.get_request_count(), 3);

        let metrics = state.metrics.read().await;
        let posts = &metrics["/api/posts"];
        assert_eq!(posts.status_counts[&200], 1);
        assert_eq!(posts.status_counts[&401], 1);
        assert_eq!(posts.latency_count, 2);
        assert_eq!(posts.min_latency_us, 5_000);
        assert_eq!(posts.max_latency_us, 60_000);
        assert_eq!(posts.latency_buckets.under_10ms, 1);
        assert_eq!(posts.latency_buckets.ms_50_100, 1);
    }
}

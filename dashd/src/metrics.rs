use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use std::{ops::Deref, sync::Arc};

const API_ENDPOINTS: &[&str] = &["keys", "key", "stats", "clients", "kill_client"];

#[derive(Clone)]
pub struct SharedMetrics {
    metrics: Arc<Metrics>,
}

impl SharedMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        Ok(Self {
            metrics: Arc::new(Metrics::new()?),
        })
    }
}

impl Deref for SharedMetrics {
    type Target = Metrics;

    fn deref(&self) -> &Self::Target {
        &self.metrics
    }
}

/// Counters for the dashboard API, kept in a registry owned by this instance.
pub struct Metrics {
    registry: Registry,
    api_calls: IntCounterVec,
    store_errors: IntCounter,
    key_count: IntGauge,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let api_calls = IntCounterVec::new(
            Opts::new(
                "dashd_api_method_invocations",
                "Amount of times a particular API endpoint has been called in the lifetime of the process",
            ),
            &["endpoint"],
        )?;
        // instantiate the counters so every endpoint shows up, even at zero
        for endpoint in API_ENDPOINTS {
            api_calls.with_label_values(&[endpoint]);
        }

        let store_errors = IntCounter::new(
            "dashd_store_errors",
            "Amount of store commands which failed while serving a request",
        )?;

        let key_count = IntGauge::new(
            "dashd_store_key_count",
            "Amount of keys seen in the store by the last stats request",
        )?;

        registry.register(Box::new(api_calls.clone()))?;
        registry.register(Box::new(store_errors.clone()))?;
        registry.register(Box::new(key_count.clone()))?;

        Ok(Self {
            registry,
            api_calls,
            store_errors,
            key_count,
        })
    }

    pub fn add_api_call(&self, endpoint: &str) {
        self.api_calls.with_label_values(&[endpoint]).inc();
    }

    pub fn api_calls(&self, endpoint: &str) -> u64 {
        self.api_calls.with_label_values(&[endpoint]).get()
    }

    pub fn store_error(&self) {
        self.store_errors.inc()
    }

    pub fn store_errors(&self) -> u64 {
        self.store_errors.get()
    }

    pub fn set_key_count(&self, count: usize) {
        self.key_count.set(count as i64)
    }

    /// Render all metrics in the Prometheus text format.
    pub fn encode(&self) -> Result<Vec<u8>, prometheus::Error> {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(buffer)
    }
}

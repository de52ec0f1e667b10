use prometheus::{Encoder, Histogram, HistogramOpts, IntCounterVec, Opts, Registry, TextEncoder};

/// Prometheus metrics for the bearer-token pipeline.
#[derive(Clone)]
pub struct AuthMetrics {
    pub registry: Registry,
    pub auth_requests_total: IntCounterVec,
    pub auth_failures_total: IntCounterVec,
    pub public_key_fetch_duration_seconds: Histogram,
}

impl AuthMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let auth_requests_total = IntCounterVec::new(
            Opts::new(
                "auth_requests_total",
                "Requests seen by the JWT middleware, by outcome",
            ),
            &["outcome"],
        )?;
        let auth_failures_total = IntCounterVec::new(
            Opts::new(
                "auth_failures_total",
                "Rejected requests by pipeline stage and reason",
            ),
            &["stage", "reason"],
        )?;
        let public_key_fetch_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "public_key_fetch_duration_seconds",
                "Time spent resolving a verification key",
            )
            .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
        )?;
        registry.register(Box::new(auth_requests_total.clone()))?;
        registry.register(Box::new(auth_failures_total.clone()))?;
        registry.register(Box::new(public_key_fetch_duration_seconds.clone()))?;
        Ok(AuthMetrics {
            registry,
            auth_requests_total,
            auth_failures_total,
            public_key_fetch_duration_seconds,
        })
    }

    pub fn record_success(&self) {
        self.auth_requests_total.with_label_values(&["accepted"]).inc();
    }

    pub fn record_failure(&self, stage: &str, reason: &str) {
        self.auth_requests_total.with_label_values(&["rejected"]).inc();
        self.auth_failures_total
            .with_label_values(&[stage, reason])
            .inc();
    }

    pub fn failure_count(&self, stage: &str, reason: &str) -> u64 {
        self.auth_failures_total
            .with_label_values(&[stage, reason])
            .get()
    }

    /// Text exposition of every registered metric.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|err| prometheus::Error::Msg(err.to_string()))
    }
}

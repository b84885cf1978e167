use anyhow::Result;
use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct AuthMetrics {
    registry: Registry,
    login_attempts: IntCounterVec,
    registration_decisions: IntCounterVec,
    policy_writes: IntCounterVec,
}

impl AuthMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let login_attempts = IntCounterVec::new(
            Opts::new(
                "auth_login_attempts_total",
                "Count of login attempts grouped by outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(login_attempts.clone()))?;

        let registration_decisions = IntCounterVec::new(
            Opts::new(
                "auth_registration_decisions_total",
                "Registration attempts grouped by gating outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(registration_decisions.clone()))?;

        let policy_writes = IntCounterVec::new(
            Opts::new("auth_policy_writes_total", "Individual policy upserts by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(policy_writes.clone()))?;

        Ok(Self {
            registry,
            login_attempts,
            registration_decisions,
            policy_writes,
        })
    }

    pub fn login_attempt(&self, outcome: &str) {
        self.login_attempts.with_label_values(&[outcome]).inc();
    }

    pub fn registration_decision(&self, outcome: &str) {
        self.registration_decisions.with_label_values(&[outcome]).inc();
    }

    pub fn policy_writes(&self, outcome: &str, count: usize) {
        self.policy_writes
            .with_label_values(&[outcome])
            .inc_by(count as u64);
    }

    pub fn render(&self) -> Result<Response> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        let response = Response::builder()
            .status(StatusCode::OK)
            .header(
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/plain; version=0.0.4"),
            )
            .body(Body::from(buffer))?;
        Ok(response)
    }
}

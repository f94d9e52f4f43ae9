use prometheus::{Encoder, Histogram, IntCounterVec, Registry, TextEncoder};

/// Outcome label recorded when the gate lets a request through.
pub const OUTCOME_ALLOWED: &str = "allowed";

#[derive(Clone)]
pub struct AuthGateMetrics {
    pub registry: Registry,
    pub decisions_total: IntCounterVec,
    pub identity_call_seconds: Histogram,
}

impl AuthGateMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();
        let decisions_total = IntCounterVec::new(
            prometheus::Opts::new(
                "auth_gate_decisions_total",
                "Auth gate decisions by outcome (allowed or rejection code)"
            ),
            &["outcome"]
        ).unwrap();
        let identity_call_seconds = Histogram::with_opts(
            prometheus::HistogramOpts::new(
                "auth_gate_identity_call_seconds",
                "Latency of token validation calls to the identity service"
            ).buckets(vec![0.005,0.01,0.025,0.05,0.1,0.25,0.5,1.0,2.5,5.0])
        ).unwrap();
        let _ = registry.register(Box::new(decisions_total.clone()));
        let _ = registry.register(Box::new(identity_call_seconds.clone()));
        AuthGateMetrics { registry, decisions_total, identity_call_seconds }
    }

    pub fn record_decision(&self, outcome: &str) {
        self.decisions_total.with_label_values(&[outcome]).inc();
    }

    pub fn observe_identity_call(&self, seconds: f64) {
        self.identity_call_seconds.observe(seconds);
    }

    pub fn decision_count(&self, outcome: &str) -> u64 {
        self.decisions_total.with_label_values(&[outcome]).get()
    }

    /// Prometheus text exposition of everything in the registry.
    pub fn gather_text(&self) -> String {
        let mut buf = Vec::new();
        let encoder = TextEncoder::new();
        if encoder.encode(&self.registry.gather(), &mut buf).is_err() {
            return String::new();
        }
        String::from_utf8(buf).unwrap_or_default()
    }
}

impl Default for AuthGateMetrics {
    fn default() -> Self { Self::new() }
}

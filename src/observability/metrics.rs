use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder,
};

use crate::models::assignment::Terminal;

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub transitions_total: IntCounterVec,
    pub queue_length: IntGaugeVec,
    pub transition_latency_seconds: HistogramVec,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let transitions_total = IntCounterVec::new(
            Opts::new(
                "transitions_total",
                "Assignment status transitions by target status and outcome",
            ),
            &["event", "outcome"],
        )
        .expect("valid transitions_total metric");

        let queue_length = IntGaugeVec::new(
            Opts::new("queue_length", "Vans currently queued per terminal"),
            &["terminal"],
        )
        .expect("valid queue_length metric");

        let transition_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "transition_latency_seconds",
                "Latency of status transitions including queue recalculation",
            ),
            &["outcome"],
        )
        .expect("valid transition_latency_seconds metric");

        registry
            .register(Box::new(transitions_total.clone()))
            .expect("register transitions_total");
        registry
            .register(Box::new(queue_length.clone()))
            .expect("register queue_length");
        registry
            .register(Box::new(transition_latency_seconds.clone()))
            .expect("register transition_latency_seconds");

        for terminal in Terminal::ALL {
            queue_length.with_label_values(&[terminal.as_str()]).set(0);
        }

        Self {
            registry,
            transitions_total,
            queue_length,
            transition_latency_seconds,
        }
    }

    pub fn observe_transition(&self, event: &str, outcome: &str, elapsed_seconds: f64) {
        self.transitions_total
            .with_label_values(&[event, outcome])
            .inc();
        self.transition_latency_seconds
            .with_label_values(&[outcome])
            .observe(elapsed_seconds);
    }

    pub fn set_queue_length(&self, terminal: Terminal, len: usize) {
        self.queue_length
            .with_label_values(&[terminal.as_str()])
            .set(len as i64);
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}

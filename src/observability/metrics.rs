use prometheus::{
    Encoder, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub assignments_total: IntCounterVec,
    pub reminders_sent_total: IntCounter,
    pub scheduler_cycles_total: IntCounter,
    pub assignment_latency_seconds: HistogramVec,
    pub available_drivers: IntGauge,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let assignments_total = IntCounterVec::new(
            Opts::new("assignments_total", "Total assignment attempts by outcome"),
            &["outcome"],
        )
        .expect("valid assignments_total metric");

        let reminders_sent_total = IntCounter::new(
            "reminders_sent_total",
            "Total ride reminders dispatched",
        )
        .expect("valid reminders_sent_total metric");

        let scheduler_cycles_total = IntCounter::new(
            "scheduler_cycles_total",
            "Total completed scheduler poll cycles",
        )
        .expect("valid scheduler_cycles_total metric");

        let assignment_latency_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "assignment_latency_seconds",
                "Latency of assignment processing in seconds",
            ),
            &["outcome"],
        )
        .expect("valid assignment_latency_seconds metric");

        let available_drivers = IntGauge::new(
            "available_drivers",
            "Current number of drivers accepting rides",
        )
        .expect("valid available_drivers metric");

        registry
            .register(Box::new(assignments_total.clone()))
            .expect("register assignments_total");
        registry
            .register(Box::new(reminders_sent_total.clone()))
            .expect("register reminders_sent_total");
        registry
            .register(Box::new(scheduler_cycles_total.clone()))
            .expect("register scheduler_cycles_total");
        registry
            .register(Box::new(assignment_latency_seconds.clone()))
            .expect("register assignment_latency_seconds");
        registry
            .register(Box::new(available_drivers.clone()))
            .expect("register available_drivers");

        Self {
            registry,
            assignments_total,
            reminders_sent_total,
            scheduler_cycles_total,
            assignment_latency_seconds,
            available_drivers,
        }
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

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

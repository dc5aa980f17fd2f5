//! Process-level ingestion counters.

use prometheus::{IntCounter, Opts, Registry};

/// Counters describing the health of the ingestion pipeline.
///
/// Handles are cheap to clone and all clones update the same counters, so the
/// transport, the envelope validator and the metric registry can share them.
#[derive(Clone)]
pub struct IngestionCounters {
    messages: IntCounter,
    failures: IntCounter,
}

impl IngestionCounters {
    /// Creates the counters under `namespace` and registers them.
    ///
    /// # Errors
    ///
    /// Returns an error if the namespace is not a valid metric name prefix or
    /// the counters are already registered.
    pub fn register(registry: &Registry, namespace: &str) -> Result<Self, prometheus::Error> {
        let messages = IntCounter::with_opts(
            Opts::new(
                "exporter_syslog_messages",
                "Current total syslog messages received.",
            )
            .namespace(namespace),
        )?;
        let failures = IntCounter::with_opts(
            Opts::new(
                "exporter_syslog_parse_failure",
                "Number of errors while parsing syslog messages.",
            )
            .namespace(namespace),
        )?;

        registry.register(Box::new(messages.clone()))?;
        registry.register(Box::new(failures.clone()))?;

        Ok(Self { messages, failures })
    }

    /// Counts one received message.
    pub fn record_message(&self) {
        self.messages.inc();
    }

    /// Counts one ingestion failure.
    pub fn record_failure(&self) {
        self.failures.inc();
    }

    /// Returns the number of messages received so far.
    #[must_use]
    pub fn messages(&self) -> u64 {
        self.messages.get()
    }

    /// Returns the number of failures so far.
    #[must_use]
    pub fn failures(&self) -> u64 {
        self.failures.get()
    }
}

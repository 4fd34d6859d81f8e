//! Call counter definition

use prometheus::{opts, IntCounterVec, Registry, Result};

pub const CALLS_TOTAL_NAME: &str = "grpc_server_calls_total";
pub const CALLS_TOTAL_HELP: &str = "number of gRPC calls";

/// Labels applied when none are given: the host operating system
pub fn default_labels() -> Vec<(String, String)> {
    vec![("os".to_string(), std::env::consts::OS.to_lowercase())]
}

/// Monotonic count of calls under one fixed label set
///
/// Cloning shares the underlying counter.
#[derive(Clone, Debug)]
pub struct CallCounter {
    calls_total: IntCounterVec,
    label_values: Vec<String>,
}

impl CallCounter {
    /// Create the counter and register it with `registry`
    pub fn register(registry: &Registry, labels: Vec<(String, String)>) -> Result<Self> {
        let labels = if labels.is_empty() {
            default_labels()
        } else {
            labels
        };

        let label_names: Vec<&str> = labels.iter().map(|(name, _)| name.as_str()).collect();
        let calls_total =
            IntCounterVec::new(opts!(CALLS_TOTAL_NAME, CALLS_TOTAL_HELP), &label_names)?;
        registry.register(Box::new(calls_total.clone()))?;

        Ok(Self {
            calls_total,
            label_values: labels.into_iter().map(|(_, value)| value).collect(),
        })
    }

    fn values(&self) -> Vec<&str> {
        self.label_values.iter().map(String::as_str).collect()
    }

    pub fn inc(&self) {
        self.calls_total.with_label_values(&self.values()).inc();
    }

    pub fn get(&self) -> u64 {
        self.calls_total.with_label_values(&self.values()).get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_labels_use_host_os() {
        let registry = Registry::new();
        let counter = CallCounter::register(&registry, Vec::new()).unwrap();
        counter.inc();

        let families = registry.gather();
        assert_eq!(families.len(), 1);
        assert_eq!(families[0].get_name(), CALLS_TOTAL_NAME);

        let metric = &families[0].get_metric()[0];
        assert_eq!(metric.get_label()[0].get_name(), "os");
        assert_eq!(metric.get_label()[0].get_value(), std::env::consts::OS);
        assert_eq!(metric.get_counter().get_value() as u64, 1);
    }

    #[test]
    fn test_double_registration_fails() {
        let registry = Registry::new();
        CallCounter::register(&registry, Vec::new()).unwrap();
        assert!(CallCounter::register(&registry, Vec::new()).is_err());
    }

    #[test]
    fn test_custom_labels() {
        let registry = Registry::new();
        let counter = CallCounter::register(
            &registry,
            vec![
                ("service".to_string(), "section".to_string()),
                ("region".to_string(), "eu".to_string()),
            ],
        )
        .unwrap();

        counter.inc();
        counter.inc();
        assert_eq!(counter.get(), 2);
    }
}

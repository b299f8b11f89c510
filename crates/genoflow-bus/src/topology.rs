//! Exchange and queue layout.
//!
//! Each job domain has a fan-out input exchange feeding its job queue and a
//! fan-out output exchange for completion notifications. One extra queue is
//! bound to both output exchanges for downstream subscribers.

use genoflow_core::{AmqpConfig, JobKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainTopology {
    pub kind: JobKind,
    pub input_exchange: String,
    pub output_exchange: String,
    pub queue: String,
    /// Broker-side consumer timeout for the job queue, if any
    pub consumer_timeout_ms: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    pub validation: DomainTopology,
    pub processing: DomainTopology,
    pub notification_queue: String,
}

impl Topology {
    pub fn from_config(config: &AmqpConfig) -> Self {
        Self {
            validation: DomainTopology {
                kind: JobKind::Validation,
                input_exchange: config.validation_exchange_input.clone(),
                output_exchange: config.validation_exchange_output.clone(),
                queue: config.validation_queue.clone(),
                consumer_timeout_ms: None,
            },
            processing: DomainTopology {
                kind: JobKind::Processing,
                input_exchange: config.processing_exchange_input.clone(),
                output_exchange: config.processing_exchange_output.clone(),
                queue: config.processing_queue.clone(),
                consumer_timeout_ms: Some(config.processing_consumer_timeout_ms),
            },
            notification_queue: config.notification_queue.clone(),
        }
    }

    pub fn domain(&self, kind: JobKind) -> &DomainTopology {
        match kind {
            JobKind::Validation => &self.validation,
            JobKind::Processing => &self.processing,
        }
    }

    pub fn domains(&self) -> [&DomainTopology; 2] {
        [&self.validation, &self.processing]
    }

    pub fn exchanges(&self) -> Vec<&str> {
        self.domains()
            .iter()
            .flat_map(|d| [d.input_exchange.as_str(), d.output_exchange.as_str()])
            .collect()
    }

    /// Every (queue, exchange) binding.
    pub fn bindings(&self) -> Vec<(&str, &str)> {
        let mut bindings: Vec<(&str, &str)> = self
            .domains()
            .iter()
            .map(|d| (d.queue.as_str(), d.input_exchange.as_str()))
            .collect();
        for d in self.domains() {
            bindings.push((self.notification_queue.as_str(), d.output_exchange.as_str()));
        }
        bindings
    }
}

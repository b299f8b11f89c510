//! Message bus transport.
//!
//! [`MessageBus`] is the publish / consume-with-ack boundary. [`AmqpBus`]
//! implements it on RabbitMQ via lapin; [`Topology`] describes the exchanges
//! and queues both domains need. [`QueueListener`] runs the consume loop for
//! one job domain and publishes a completion notification for every message.

pub mod amqp;
pub mod error;
pub mod listener;
#[cfg(any(test, feature = "test-helpers"))]
pub mod memory;
pub mod topology;
pub mod traits;

pub use amqp::AmqpBus;
pub use error::{BusError, BusResult};
pub use listener::{HandlerOutcome, JobHandler, QueueListener};
#[cfg(any(test, feature = "test-helpers"))]
pub use memory::InMemoryBus;
pub use topology::{DomainTopology, Topology};
pub use traits::{Acknowledger, Delivery, DeliveryStream, MessageBus};

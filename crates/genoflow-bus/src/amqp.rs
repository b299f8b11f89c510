//! RabbitMQ transport via lapin.

use crate::error::{BusError, BusResult};
use crate::topology::Topology;
use crate::traits::{Acknowledger, Delivery, DeliveryStream, MessageBus};
use async_trait::async_trait;
use futures::StreamExt;
use lapin::acker::Acker;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicPublishOptions, BasicQosOptions,
    ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions,
};
use lapin::types::{AMQPValue, FieldTable};
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind};
use std::sync::atomic::{AtomicBool, Ordering};

/// Persistent delivery mode
const PERSISTENT: u8 = 2;

/// One connection and one shared channel with prefetch 1.
pub struct AmqpBus {
    connection: Connection,
    channel: Channel,
    closed: AtomicBool,
}

struct LapinAcker(Acker);

#[async_trait]
impl Acknowledger for LapinAcker {
    async fn ack(&self) -> BusResult<()> {
        self.0.ack(BasicAckOptions::default()).await?;
        Ok(())
    }
}

impl AmqpBus {
    pub async fn connect(addr: &str) -> BusResult<Self> {
        let connection = Connection::connect(addr, ConnectionProperties::default()).await?;
        let channel = connection.create_channel().await?;
        channel.basic_qos(1, BasicQosOptions::default()).await?;
        tracing::info!("Connected to AMQP broker");
        Ok(Self {
            connection,
            channel,
            closed: AtomicBool::new(false),
        })
    }

    /// Declare durable fan-out exchanges, the queues and their bindings.
    pub async fn declare(&self, topology: &Topology) -> BusResult<()> {
        let durable_exchange = ExchangeDeclareOptions {
            durable: true,
            ..ExchangeDeclareOptions::default()
        };
        for exchange in topology.exchanges() {
            self.channel
                .exchange_declare(
                    exchange,
                    ExchangeKind::Fanout,
                    durable_exchange,
                    FieldTable::default(),
                )
                .await?;
        }

        let queue_opts = queue_options();
        for domain in topology.domains() {
            let mut args = FieldTable::default();
            if let Some(timeout) = domain.consumer_timeout_ms {
                args.insert("x-consumer-timeout".into(), AMQPValue::LongLongInt(timeout));
            }
            self.channel
                .queue_declare(&domain.queue, queue_opts, args)
                .await?;
        }
        self.channel
            .queue_declare(
                &topology.notification_queue,
                queue_opts,
                FieldTable::default(),
            )
            .await?;

        for (queue, exchange) in topology.bindings() {
            self.channel
                .queue_bind(
                    queue,
                    exchange,
                    "",
                    QueueBindOptions::default(),
                    FieldTable::default(),
                )
                .await?;
        }

        tracing::info!(
            exchanges = ?topology.exchanges(),
            notification_queue = %topology.notification_queue,
            "AMQP topology declared"
        );
        Ok(())
    }

    fn ensure_open(&self) -> BusResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            Err(BusError::Closed)
        } else {
            Ok(())
        }
    }
}

/// Queues are transient; brokers already holding them reject a redeclare
/// with different durability.
fn queue_options() -> QueueDeclareOptions {
    QueueDeclareOptions {
        durable: false,
        ..QueueDeclareOptions::default()
    }
}

#[async_trait]
impl MessageBus for AmqpBus {
    async fn publish(&self, exchange: &str, payload: &[u8]) -> BusResult<()> {
        self.ensure_open()?;
        let properties = BasicProperties::default()
            .with_content_type("application/json".into())
            .with_delivery_mode(PERSISTENT);
        self.channel
            .basic_publish(
                exchange,
                "",
                BasicPublishOptions::default(),
                payload,
                properties,
            )
            .await?
            .await?;
        tracing::debug!(exchange = %exchange, size_bytes = payload.len(), "Published message");
        Ok(())
    }

    async fn consume(&self, queue: &str, consumer_tag: &str) -> BusResult<DeliveryStream> {
        self.ensure_open()?;
        let consumer = self
            .channel
            .basic_consume(
                queue,
                consumer_tag,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await?;
        tracing::info!(queue = %queue, consumer_tag = %consumer_tag, "Consuming");

        let stream = consumer.map(|delivery| -> BusResult<Delivery> {
            let delivery = delivery?;
            Ok(Delivery::new(
                delivery.data,
                Box::new(LapinAcker(delivery.acker)),
            ))
        });
        Ok(stream.boxed())
    }

    async fn close(&self) -> BusResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.channel.close(200, "shutdown").await?;
        self.connection.close(200, "shutdown").await?;
        tracing::info!("AMQP connection closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queues_are_declared_transient() {
        let opts = queue_options();
        assert!(!opts.durable);
        assert!(!opts.exclusive);
        assert!(!opts.auto_delete);
    }
}

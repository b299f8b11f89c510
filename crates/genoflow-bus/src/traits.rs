use crate::error::BusResult;
use async_trait::async_trait;
use futures::stream::BoxStream;

/// Settles one delivery with the broker.
#[async_trait]
pub trait Acknowledger: Send + Sync {
    async fn ack(&self) -> BusResult<()>;
}

/// A message taken from a queue.
pub struct Delivery {
    pub payload: Vec<u8>,
    acker: Box<dyn Acknowledger>,
}

impl Delivery {
    pub fn new(payload: Vec<u8>, acker: Box<dyn Acknowledger>) -> Self {
        Self { payload, acker }
    }

    pub async fn ack(&self) -> BusResult<()> {
        self.acker.ack().await
    }
}

impl std::fmt::Debug for Delivery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Delivery")
            .field("payload_len", &self.payload.len())
            .finish()
    }
}

pub type DeliveryStream = BoxStream<'static, BusResult<Delivery>>;

/// Publish and consume over named exchanges and queues.
///
/// Safe for concurrent use. After [`MessageBus::close`], publish and consume
/// fail with `BusError::Closed`.
#[async_trait]
pub trait MessageBus: Send + Sync {
    async fn publish(&self, exchange: &str, payload: &[u8]) -> BusResult<()>;

    async fn consume(&self, queue: &str, consumer_tag: &str) -> BusResult<DeliveryStream>;

    async fn close(&self) -> BusResult<()>;
}

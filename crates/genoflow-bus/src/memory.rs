//! In-process fan-out bus for tests.

use crate::error::{BusError, BusResult};
use crate::topology::Topology;
use crate::traits::{Acknowledger, Delivery, DeliveryStream, MessageBus};
use async_trait::async_trait;
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

#[derive(Default)]
struct Queue {
    sender: Option<UnboundedSender<Vec<u8>>>,
    receiver: Option<UnboundedReceiver<Vec<u8>>>,
}

#[derive(Default)]
struct State {
    bindings: HashMap<String, Vec<String>>,
    queues: HashMap<String, Queue>,
    published: Vec<(String, Vec<u8>)>,
}

/// Fan-out semantics: a message published to an exchange is copied to every
/// queue bound to it.
#[derive(Default)]
pub struct InMemoryBus {
    state: Mutex<State>,
    acks: Arc<AtomicUsize>,
    closed: AtomicBool,
}

struct CountingAcker(Arc<AtomicUsize>);

#[async_trait]
impl Acknowledger for CountingAcker {
    async fn ack(&self) -> BusResult<()> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl InMemoryBus {
    pub fn new(topology: &Topology) -> Self {
        let bus = Self::default();
        {
            let mut state = bus.state();
            for exchange in topology.exchanges() {
                state.bindings.entry(exchange.to_string()).or_default();
            }
            for (queue, exchange) in topology.bindings() {
                state
                    .bindings
                    .entry(exchange.to_string())
                    .or_default()
                    .push(queue.to_string());
                state.queues.entry(queue.to_string()).or_insert_with(|| {
                    let (tx, rx) = unbounded_channel();
                    Queue {
                        sender: Some(tx),
                        receiver: Some(rx),
                    }
                });
            }
        }
        bus
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Payloads published to `exchange`, in order.
    pub fn published(&self, exchange: &str) -> Vec<Vec<u8>> {
        self.state()
            .published
            .iter()
            .filter(|(e, _)| e == exchange)
            .map(|(_, p)| p.clone())
            .collect()
    }

    /// Pending messages on a queue nobody consumes.
    pub fn drain(&self, queue: &str) -> Vec<Vec<u8>> {
        let mut state = self.state();
        let mut out = Vec::new();
        if let Some(rx) = state.queues.get_mut(queue).and_then(|q| q.receiver.as_mut()) {
            while let Ok(msg) = rx.try_recv() {
                out.push(msg);
            }
        }
        out
    }

    pub fn ack_count(&self) -> usize {
        self.acks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessageBus for InMemoryBus {
    async fn publish(&self, exchange: &str, payload: &[u8]) -> BusResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BusError::Closed);
        }
        let mut state = self.state();
        let queues = state
            .bindings
            .get(exchange)
            .cloned()
            .ok_or_else(|| BusError::UnknownExchange(exchange.to_string()))?;
        for queue in queues {
            if let Some(tx) = state.queues.get(&queue).and_then(|q| q.sender.as_ref()) {
                // A dropped receiver only means nobody listens any more.
                let _ = tx.send(payload.to_vec());
            }
        }
        state
            .published
            .push((exchange.to_string(), payload.to_vec()));
        Ok(())
    }

    async fn consume(&self, queue: &str, _consumer_tag: &str) -> BusResult<DeliveryStream> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BusError::Closed);
        }
        let receiver = {
            let mut state = self.state();
            let entry = state
                .queues
                .get_mut(queue)
                .ok_or_else(|| BusError::UnknownQueue(queue.to_string()))?;
            entry
                .receiver
                .take()
                .ok_or_else(|| BusError::AlreadyConsumed(queue.to_string()))?
        };
        let acks = self.acks.clone();
        let stream = futures::stream::unfold(receiver, move |mut rx| {
            let acks = acks.clone();
            async move {
                let payload = rx.recv().await?;
                let delivery = Delivery::new(payload, Box::new(CountingAcker(acks)));
                Some((Ok(delivery), rx))
            }
        });
        Ok(stream.boxed())
    }

    async fn close(&self) -> BusResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        for queue in self.state().queues.values_mut() {
            queue.sender = None;
        }
        Ok(())
    }
}

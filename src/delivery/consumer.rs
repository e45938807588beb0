//! In-process delivery from a message channel.
//!
//! A bus client (or anything else producing results) pushes messages into
//! an mpsc channel; the consumer drains it into the engine until the
//! channel closes or shutdown is signalled.

use tokio::sync::{broadcast, mpsc};

use crate::delivery::message::IncomingMessage;
use crate::rendezvous::{DeliveryOutcome, RendezvousEngine};

/// Hand one message to the engine.
pub fn dispatch<M>(engine: &RendezvousEngine<M::Payload>, message: M) -> DeliveryOutcome
where
    M: IncomingMessage,
    M::Payload: Send + Sync + 'static,
{
    let id = message.correlation_id();
    let outcome = engine.deliver_result(id, message.into_payload());
    if outcome == DeliveryOutcome::Duplicate {
        tracing::info!(correlation_id = %id, "Ignoring redelivered message");
    }
    outcome
}

/// Drains a message channel into the rendezvous engine.
pub struct DeliveryConsumer<M: IncomingMessage> {
    engine: RendezvousEngine<M::Payload>,
    messages: mpsc::Receiver<M>,
}

impl<M> DeliveryConsumer<M>
where
    M: IncomingMessage + Send + 'static,
    M::Payload: Send + Sync + 'static,
{
    /// Create a consumer and the sender that feeds it.
    pub fn channel(engine: RendezvousEngine<M::Payload>, capacity: usize) -> (mpsc::Sender<M>, Self) {
        let (tx, messages) = mpsc::channel(capacity);
        (tx, Self { engine, messages })
    }

    /// Run until every sender is dropped or shutdown fires.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!("Delivery consumer started");
        loop {
            tokio::select! {
                message = self.messages.recv() => match message {
                    Some(message) => {
                        dispatch(&self.engine, message);
                    }
                    None => {
                        tracing::info!("Delivery channel closed, consumer exiting");
                        break;
                    }
                },
                _ = shutdown.recv() => {
                    tracing::info!("Delivery consumer received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlation::{CorrelationId, EntryState};
    use crate::delivery::Message;
    use crate::rendezvous::{ClientContext, Outcome};
    use serde_json::json;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_consumer_resolves_waiter() {
        let engine = RendezvousEngine::new(Duration::from_secs(4));
        let (tx, consumer) = DeliveryConsumer::<Message>::channel(engine.clone(), 16);
        let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let consumer = tokio::spawn(consumer.run(shutdown_rx));

        let id = CorrelationId::new();
        let waiter = tokio::spawn({
            let engine = engine.clone();
            async move { engine.await_result(id, &ClientContext::default()).await }
        });
        while engine.state(&id) != Some(EntryState::Waiting) {
            tokio::task::yield_now().await;
        }

        tx.send(Message::new(id).with_field("data", "Data1")).await.unwrap();

        let outcome = waiter.await.unwrap();
        assert_eq!(
            outcome,
            Outcome::Delivered(json!({ "correlationId": id.to_string(), "data": "Data1" }))
        );

        drop(tx);
        consumer.await.unwrap();
        assert_eq!(engine.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_consumer_stops_on_shutdown() {
        let engine = RendezvousEngine::new(Duration::from_secs(4));
        let (_tx, consumer) = DeliveryConsumer::<Message>::channel(engine, 16);
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let consumer = tokio::spawn(consumer.run(shutdown_rx));

        shutdown_tx.send(()).unwrap();
        consumer.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatch_reports_duplicates() {
        let engine = RendezvousEngine::new(Duration::from_secs(4));
        let id = CorrelationId::new();

        assert_eq!(dispatch(&engine, Message::new(id)), DeliveryOutcome::Stored);
        assert_eq!(dispatch(&engine, Message::new(id)), DeliveryOutcome::Duplicate);
        assert_eq!(engine.pending(), 1);
    }
}

//! Fan-out of completed transmissions to independent consumer queues

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, trace};

use crate::types::Transmission;

/// Receiving end of one consumer's queue.
pub type ConsumerQueue = mpsc::UnboundedReceiver<Transmission>;

/// Duplicates each transmission into every registered consumer queue.
///
/// Queues are unbounded, so [`Fanout::publish`] never waits on a consumer.
/// A consumer that stops draining only grows its own queue. Order within a
/// queue follows publish order; nothing is promised across queues.
///
/// Cloning yields another handle onto the same set of consumers.
#[derive(Debug, Clone, Default)]
pub struct Fanout {
    consumers: Arc<Mutex<Vec<mpsc::UnboundedSender<Transmission>>>>,
}

impl Fanout {
    /// Create a fanout with no consumers
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new consumer.
    ///
    /// The queue receives every transmission published after this call.
    /// Dropping the queue unregisters it on the next publish.
    pub fn subscribe(&self) -> ConsumerQueue {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut consumers = self.consumers.lock();
        consumers.push(tx);
        debug!("Consumer registered ({} total)", consumers.len());
        rx
    }

    /// Register a new consumer as a [`futures::Stream`]
    pub fn stream(&self) -> UnboundedReceiverStream<Transmission> {
        UnboundedReceiverStream::new(self.subscribe())
    }

    /// Push a copy of `transmission` into every live queue.
    ///
    /// Returns how many queues received it.
    pub fn publish(&self, transmission: Transmission) -> usize {
        let mut consumers = self.consumers.lock();
        let before = consumers.len();
        consumers.retain(|tx| tx.send(transmission.clone()).is_ok());

        let pruned = before - consumers.len();
        if pruned > 0 {
            debug!("Pruned {} closed consumer queue(s)", pruned);
        }
        trace!(
            "Transmission {} fanned out to {} queue(s)",
            transmission.transmission_number(),
            consumers.len()
        );
        consumers.len()
    }

    /// Number of registered consumers, including any closed since the last publish
    pub fn consumer_count(&self) -> usize {
        self.consumers.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TransmissionType;

    fn transmission(n: u8) -> Transmission {
        Transmission::new(n, TransmissionType::Log, format!("line {}", n), 0.0)
    }

    #[test]
    fn every_queue_gets_its_own_copy_in_order() {
        let fanout = Fanout::new();
        let mut a = fanout.subscribe();
        let mut b = fanout.subscribe();

        for n in 0..5 {
            assert_eq!(fanout.publish(transmission(n)), 2);
        }

        for queue in [&mut a, &mut b] {
            let received: Vec<u8> = std::iter::from_fn(|| queue.try_recv().ok())
                .map(|t| t.transmission_number())
                .collect();
            assert_eq!(received, vec![0, 1, 2, 3, 4]);
        }
    }

    #[test]
    fn stalled_consumer_does_not_block_others() {
        let fanout = Fanout::new();
        let _stalled = fanout.subscribe();
        let mut live = fanout.subscribe();

        for n in 0..=255u8 {
            fanout.publish(transmission(n));
            assert_eq!(live.try_recv().unwrap().transmission_number(), n);
        }
        assert_eq!(fanout.consumer_count(), 2);
    }

    #[test]
    fn dropped_queues_are_pruned() {
        let fanout = Fanout::new();
        let kept = fanout.subscribe();
        drop(fanout.subscribe());

        assert_eq!(fanout.consumer_count(), 2);
        assert_eq!(fanout.publish(transmission(1)), 1);
        assert_eq!(fanout.consumer_count(), 1);
        drop(kept);
        assert_eq!(fanout.publish(transmission(2)), 0);
    }

    #[test]
    fn late_subscriber_sees_only_later_transmissions() {
        let fanout = Fanout::new();
        let _early = fanout.subscribe();
        fanout.publish(transmission(1));

        let mut late = fanout.subscribe();
        fanout.publish(transmission(2));
        assert_eq!(late.try_recv().unwrap().transmission_number(), 2);
        assert!(late.try_recv().is_err());
    }

    #[tokio::test]
    async fn clones_share_consumers() {
        let fanout = Fanout::new();
        let mut queue = fanout.subscribe();
        let publisher = fanout.clone();

        tokio::spawn(async move {
            publisher.publish(transmission(42));
        })
        .await
        .unwrap();

        assert_eq!(queue.recv().await.unwrap().transmission_number(), 42);
    }

    #[tokio::test]
    async fn stream_ends_when_every_publisher_is_gone() {
        use futures::StreamExt;

        let fanout = Fanout::new();
        let stream = fanout.stream();
        fanout.publish(transmission(1));
        fanout.publish(transmission(2));
        drop(fanout);

        let numbers: Vec<u8> = stream.map(|t| t.transmission_number()).collect().await;
        assert_eq!(numbers, vec![1, 2]);
    }
}

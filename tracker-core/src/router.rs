//! Inbound event routing into the supervisor queue.
//!
//! Producers never block: a full queue is reported back to the caller and
//! also published as [`CloudError::QueueFull`] so the loss is visible on the
//! bus. The router is itself an [`EventSink`]; events published through it
//! that the supervisor reacts to are queued directly.

use crate::events::{CloudError, CloudEvent, CloudMessage};
use crate::transport::EventSink;

/// Error surfaced when a message cannot be enqueued.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum EnqueueError<E = ()> {
    /// Queue has reached its maximum capacity.
    QueueFull,
    /// Queue has been disconnected from its consumer.
    Disconnected,
    /// Transport-specific failure.
    Other(E),
}

/// Producer side of the supervisor queue.
pub trait EventQueueProducer {
    /// Transport-specific error type.
    type Error;

    /// Attempts to enqueue a message without blocking.
    fn try_enqueue(&mut self, message: CloudMessage) -> Result<(), EnqueueError<Self::Error>>;

    /// Returns the queue capacity if it is known.
    fn capacity(&self) -> Option<usize> {
        None
    }

    /// Returns the current queue depth if it can be observed.
    fn len(&self) -> Option<usize> {
        None
    }
}

/// Routes producer events into the supervisor queue.
pub struct EventRouter<Q, S> {
    queue: Q,
    sink: S,
}

impl<Q, S> EventRouter<Q, S>
where
    Q: EventQueueProducer,
    S: EventSink,
{
    pub const fn new(queue: Q, sink: S) -> Self {
        Self { queue, sink }
    }

    /// Enqueues `event` for the supervisor.
    pub fn route(&mut self, event: impl Into<CloudMessage>) -> Result<(), EnqueueError<Q::Error>> {
        let result = self.queue.try_enqueue(event.into());
        if let Err(EnqueueError::QueueFull) = result {
            self.sink.publish(CloudEvent::Error(CloudError::QueueFull));
        }
        result
    }

    pub fn queue(&self) -> &Q {
        &self.queue
    }

    pub fn queue_mut(&mut self) -> &mut Q {
        &mut self.queue
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_parts(self) -> (Q, S) {
        (self.queue, self.sink)
    }
}

/// Publishes on the bus; events the supervisor reacts to are also queued
/// directly, independent of room on the bus.
impl<Q, S> EventSink for EventRouter<Q, S>
where
    Q: EventQueueProducer,
    S: EventSink,
{
    fn publish(&mut self, event: CloudEvent) {
        self.sink.publish(event);
        if event.feeds_supervisor() {
            // A full queue has already been published by `route`.
            let _ = self.route(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{DataEvent, ModemEvent};
    use heapless::{Deque, Vec};

    struct Queue(Deque<CloudMessage, 2>);

    impl EventQueueProducer for Queue {
        type Error = ();

        fn try_enqueue(&mut self, message: CloudMessage) -> Result<(), EnqueueError> {
            self.0.push_back(message).map_err(|_| EnqueueError::QueueFull)
        }

        fn capacity(&self) -> Option<usize> {
            Some(self.0.capacity())
        }

        fn len(&self) -> Option<usize> {
            Some(self.0.len())
        }
    }

    #[derive(Default)]
    struct Sink(Vec<CloudEvent, 4>);

    impl EventSink for Sink {
        fn publish(&mut self, event: CloudEvent) {
            self.0.push(event).unwrap();
        }
    }

    #[test]
    fn full_queue_is_reported_and_published() {
        let mut router = EventRouter::new(Queue(Deque::new()), Sink::default());
        router.route(ModemEvent::Initialized).unwrap();
        router.route(DataEvent::ConfigGet).unwrap();

        assert_eq!(router.route(ModemEvent::LteConnected), Err(EnqueueError::QueueFull));
        assert_eq!(router.queue().len(), Some(2));

        let (queue, sink) = router.into_parts();
        assert_eq!(
            queue.0.iter().copied().collect::<Vec<_, 2>>().as_slice(),
            &[
                CloudMessage::Modem(ModemEvent::Initialized),
                CloudMessage::Data(DataEvent::ConfigGet)
            ]
        );
        assert_eq!(sink.0.as_slice(), &[CloudEvent::Error(CloudError::QueueFull)]);
    }

    #[test]
    fn published_session_events_reach_the_queue() {
        let mut router = EventRouter::new(Queue(Deque::new()), Sink::default());
        router.publish(CloudEvent::Error(CloudError::Unreachable));
        router.publish(CloudEvent::Connecting);
        router.publish(CloudEvent::Connected);

        let (queue, sink) = router.into_parts();
        assert_eq!(
            queue.0.iter().copied().collect::<Vec<_, 2>>().as_slice(),
            &[CloudMessage::Cloud(CloudEvent::Connected)]
        );
        assert_eq!(
            sink.0.as_slice(),
            &[
                CloudEvent::Error(CloudError::Unreachable),
                CloudEvent::Connecting,
                CloudEvent::Connected
            ]
        );
    }
}

#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Bounded channels connecting producers, the supervisor and the outbound bus.
//!
//! Producers push [`CloudMessage`]s through [`QueueProducer`]; the supervisor
//! and the transport publish [`CloudEvent`]s through [`OutboundPublisher`].
//! The transport publishes through a [`FirmwareRouter`], which queues the
//! session events the supervisor needs directly instead of relying on the
//! bus. Events the bus cannot take are counted and later reported on the bus
//! as [`CloudError::EventsDropped`].

#[cfg(not(target_os = "none"))]
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
#[cfg(target_os = "none")]
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, Receiver, Sender, TrySendError};
use portable_atomic::{AtomicU32, Ordering};
use tracker_core::events::{CloudError, CloudEvent, CloudMessage};
use tracker_core::router::{EnqueueError, EventQueueProducer, EventRouter};
use tracker_core::transport::EventSink;

/// Depth of the supervisor event queue.
pub const EVENT_QUEUE_DEPTH: usize = 20;

/// Depth of the outbound cloud event bus.
pub const OUTBOUND_DEPTH: usize = 8;

// Transport notices may be raised from interrupt context on the target.
#[cfg(target_os = "none")]
pub type BusMutex = CriticalSectionRawMutex;
#[cfg(not(target_os = "none"))]
pub type BusMutex = NoopRawMutex;

/// Queue drained by the supervisor task.
pub type EventQueue = Channel<BusMutex, CloudMessage, EVENT_QUEUE_DEPTH>;

pub type EventSender<'a> = Sender<'a, BusMutex, CloudMessage, EVENT_QUEUE_DEPTH>;

pub type EventReceiver<'a> = Receiver<'a, BusMutex, CloudMessage, EVENT_QUEUE_DEPTH>;

/// Bus carrying published cloud events to their consumers.
pub type OutboundBus = Channel<BusMutex, CloudEvent, OUTBOUND_DEPTH>;

pub type OutboundSender<'a> = Sender<'a, BusMutex, CloudEvent, OUTBOUND_DEPTH>;

pub type OutboundReceiver<'a> = Receiver<'a, BusMutex, CloudEvent, OUTBOUND_DEPTH>;

/// Router used by firmware producers.
pub type FirmwareRouter<'a> = EventRouter<QueueProducer<'a>, OutboundPublisher<'a>>;

/// Builds a router over the given queue and bus.
pub fn router<'a>(
    queue: &'a EventQueue,
    bus: &'a OutboundBus,
    dropped: &'a AtomicU32,
) -> FirmwareRouter<'a> {
    EventRouter::new(
        QueueProducer::new(queue.sender()),
        OutboundPublisher::new(bus.sender(), dropped),
    )
}

/// Adapter exposing the Embassy channel sender as a core queue producer.
pub struct QueueProducer<'a> {
    sender: EventSender<'a>,
}

impl<'a> QueueProducer<'a> {
    pub fn new(sender: EventSender<'a>) -> Self {
        Self { sender }
    }
}

impl EventQueueProducer for QueueProducer<'_> {
    type Error = TrySendError<CloudMessage>;

    fn try_enqueue(&mut self, message: CloudMessage) -> Result<(), EnqueueError<Self::Error>> {
        match self.sender.try_send(message) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(EnqueueError::QueueFull),
        }
    }

    fn capacity(&self) -> Option<usize> {
        Some(EVENT_QUEUE_DEPTH)
    }
}

/// Event sink writing to the outbound bus.
///
/// The bus never blocks a publisher; events that do not fit are counted in
/// the shared `dropped` counter until [`report_drops`](Self::report_drops)
/// publishes them.
pub struct OutboundPublisher<'a> {
    sender: OutboundSender<'a>,
    dropped: &'a AtomicU32,
}

impl<'a> OutboundPublisher<'a> {
    pub fn new(sender: OutboundSender<'a>, dropped: &'a AtomicU32) -> Self {
        Self { sender, dropped }
    }

    /// Publishes [`CloudError::EventsDropped`] for events counted since the
    /// last report. Returns the reported count, or `None` when nothing was
    /// dropped or the bus is still full.
    pub fn report_drops(&mut self) -> Option<u32> {
        let count = self.dropped.swap(0, Ordering::Relaxed);
        if count == 0 {
            return None;
        }
        let event = CloudEvent::Error(CloudError::EventsDropped(count));
        if self.sender.try_send(event).is_err() {
            self.dropped.fetch_add(count, Ordering::Relaxed);
            return None;
        }
        Some(count)
    }
}

impl EventSink for OutboundPublisher<'_> {
    fn publish(&mut self, event: CloudEvent) {
        if self.sender.try_send(event).is_err() {
            let total = self.dropped.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
            #[cfg(target_os = "none")]
            defmt::warn!(
                "bus: dropped {} (total {})",
                defmt::Display2Format(&event),
                total
            );
            #[cfg(not(target_os = "none"))]
            let _ = total;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracker_core::events::{DataAck, ModemEvent};

    #[test]
    fn full_event_queue_is_reported_on_the_bus() {
        let queue = EventQueue::new();
        let bus = OutboundBus::new();
        let dropped = AtomicU32::new(0);
        let mut router = router(&queue, &bus, &dropped);

        for _ in 0..EVENT_QUEUE_DEPTH {
            router.route(ModemEvent::LteConnected).unwrap();
        }
        assert_eq!(router.route(ModemEvent::LteDisconnected), Err(EnqueueError::QueueFull));
        assert_eq!(queue.len(), EVENT_QUEUE_DEPTH);

        assert_eq!(
            bus.try_receive().ok(),
            Some(CloudEvent::Error(CloudError::QueueFull))
        );
        assert_eq!(queue.try_receive().ok(), Some(CloudMessage::Modem(ModemEvent::LteConnected)));
    }

    #[test]
    fn session_events_reach_the_queue_when_the_bus_is_full() {
        let queue = EventQueue::new();
        let bus = OutboundBus::new();
        let dropped = AtomicU32::new(0);
        let mut router = router(&queue, &bus, &dropped);

        for id in 0..OUTBOUND_DEPTH {
            bus.try_send(CloudEvent::DataAck(DataAck {
                id: u32::try_from(id).unwrap(),
                len: 0,
                sent: true,
            }))
            .unwrap();
        }
        router.publish(CloudEvent::Connecting);
        router.publish(CloudEvent::Connected);

        assert_eq!(queue.len(), 1);
        assert_eq!(queue.try_receive().ok(), Some(CloudMessage::Cloud(CloudEvent::Connected)));
        assert_eq!(dropped.load(Ordering::Relaxed), 2);

        let mut publisher = OutboundPublisher::new(bus.sender(), &dropped);
        assert_eq!(publisher.report_drops(), None);
        assert_eq!(dropped.load(Ordering::Relaxed), 2);

        assert!(matches!(bus.try_receive(), Ok(CloudEvent::DataAck(_))));
        assert_eq!(publisher.report_drops(), Some(2));
        assert_eq!(dropped.load(Ordering::Relaxed), 0);
        assert_eq!(publisher.report_drops(), None);

        let mut tail = None;
        while let Ok(event) = bus.try_receive() {
            tail = Some(event);
        }
        assert_eq!(tail, Some(CloudEvent::Error(CloudError::EventsDropped(2))));
    }

    #[test]
    fn overflowing_bus_counts_drops() {
        let bus = OutboundBus::new();
        let dropped = AtomicU32::new(0);
        let mut publisher = OutboundPublisher::new(bus.sender(), &dropped);

        for _ in 0..OUTBOUND_DEPTH + 2 {
            publisher.publish(CloudEvent::Connecting);
        }

        assert_eq!(dropped.load(Ordering::Relaxed), 2);
        assert_eq!(bus.len(), OUTBOUND_DEPTH);
    }
}

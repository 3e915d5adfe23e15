use crate::bus::{OutboundPublisher, OutboundReceiver};

#[embassy_executor::task]
pub async fn run(bus: OutboundReceiver<'static>, mut publisher: OutboundPublisher<'static>) -> ! {
    loop {
        let event = bus.receive().await;
        defmt::info!("cloud: {}", defmt::Display2Format(&event));

        // Receiving made room; owe the bus the drops counted so far.
        if let Some(count) = publisher.report_drops() {
            defmt::warn!("cloud: reported {} dropped events", count);
        }
    }
}

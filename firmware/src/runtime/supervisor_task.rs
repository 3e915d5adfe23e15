use tracker_core::trace::EventId;

use crate::bus::EventReceiver;
use crate::platform::FirmwareSupervisor;
use crate::status::{ConfigSnapshot, LINK_STATUS};

#[embassy_executor::task]
pub async fn run(
    supervisor: &'static mut FirmwareSupervisor,
    config: &'static ConfigSnapshot,
    queue: EventReceiver<'static>,
) -> ! {
    let mut cursor = supervisor.trace().next_id();
    let mut current = *supervisor.device_config();
    config.store(current);
    loop {
        let message = queue.receive().await;
        if let Err(err) = supervisor.handle(message) {
            defmt::error!("supervisor: {}", defmt::Display2Format(&err));
            panic!("cloud supervisor setup failed");
        }

        LINK_STATUS.store(supervisor.state(), supervisor.sub_state());
        if *supervisor.device_config() != current {
            current = *supervisor.device_config();
            config.store(current);
        }
        cursor = drain_trace(supervisor, cursor);
    }
}

fn drain_trace(supervisor: &FirmwareSupervisor, cursor: EventId) -> EventId {
    for record in supervisor.trace().since(cursor) {
        defmt::info!(
            "trace#{}: {}",
            record.id,
            defmt::Display2Format(&record.event)
        );
    }
    supervisor.trace().next_id()
}

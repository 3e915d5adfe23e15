use embassy_futures::select::{Either, select};
use embassy_time::{Instant, Timer};
use tracker_core::events::CloudEvent;

use crate::bus::FirmwareRouter;
use crate::status::LINK_STATUS;
use crate::timer::{TimerSignal, next_deadline};

#[embassy_executor::task]
pub async fn run(signal: &'static TimerSignal, mut router: FirmwareRouter<'static>) -> ! {
    let mut deadline: Option<Instant> = None;
    loop {
        let Some(at) = deadline else {
            deadline = next_deadline(Instant::now(), signal.wait().await);
            continue;
        };

        match select(Timer::at(at), signal.wait()).await {
            Either::First(()) => {
                deadline = None;
                if !LINK_STATUS.check_due() {
                    defmt::debug!("timer: expired outside connection check, ignored");
                    continue;
                }
                if let Err(err) = router.route(CloudEvent::ConnectionTimeout) {
                    defmt::warn!("timer: timeout not queued: {}", defmt::Debug2Format(&err));
                }
            }
            Either::Second(command) => deadline = next_deadline(Instant::now(), command),
        }
    }
}

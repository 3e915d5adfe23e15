use tracker_core::translate::{AssistanceOutcome, Translation};

use crate::bus::FirmwareRouter;
use crate::platform::FirmwareTranslator;
use crate::status::ConfigSnapshot;
use crate::transport::{NoticeReceiver, translate_notice};

#[embassy_executor::task]
pub async fn run(
    translator: &'static mut FirmwareTranslator,
    config: &'static ConfigSnapshot,
    notices: NoticeReceiver<'static>,
    mut router: FirmwareRouter<'static>,
) -> ! {
    loop {
        let notice = notices.receive().await;
        let event = notice.as_event();

        match translate_notice(translator, config, &notice, &mut router) {
            Translation::Published(_) => {}
            Translation::FotaProgress => defmt::info!("transport: {}", event.label()),
            Translation::AlreadyHandled => {
                defmt::debug!("transport: payload already handled by codec");
            }
            Translation::Assistance(AssistanceOutcome::Agps) => {
                defmt::info!("transport: A-GPS data processed");
            }
            Translation::Assistance(AssistanceOutcome::Pgps) => {
                defmt::info!("transport: P-GPS data processed");
            }
            Translation::Assistance(AssistanceOutcome::Unhandled { agps, pgps }) => {
                defmt::warn!(
                    "transport: assistance data rejected (agps {}, pgps {})",
                    defmt::Debug2Format(&agps),
                    defmt::Debug2Format(&pgps)
                );
            }
        }
    }
}

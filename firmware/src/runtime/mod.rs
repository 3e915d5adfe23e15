use cortex_m::interrupt;
use cortex_m::register::primask;
use critical_section::{self, RawRestoreState};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_stm32 as hal;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use portable_atomic::AtomicU32;
use static_cell::StaticCell;

use crate::bus::{self, EventQueue, OutboundBus, OutboundPublisher};
use crate::platform::{self, FirmwareSupervisor, FirmwareTranslator};
use crate::status::ConfigSnapshot;
use crate::timer::{SignalTimer, TimerSignal};
use crate::transport::NoticeChannel;

mod bus_task;
mod supervisor_task;
mod timer_task;
mod transport_task;

critical_section::set_impl!(InterruptCriticalSection);

struct InterruptCriticalSection;

unsafe impl critical_section::Impl for InterruptCriticalSection {
    unsafe fn acquire() -> RawRestoreState {
        let primask = primask::read();
        interrupt::disable();
        primask.is_active()
    }

    unsafe fn release(restore_state: RawRestoreState) {
        if restore_state {
            unsafe {
                interrupt::enable();
            }
        }
    }
}

pub(super) static EVENT_QUEUE: EventQueue = Channel::new();
pub(super) static OUTBOUND: OutboundBus = Channel::new();
pub(super) static TIMER_SIGNAL: TimerSignal = Signal::new();
pub(super) static NOTICES: NoticeChannel = Channel::new();
pub(super) static DROPPED: AtomicU32 = AtomicU32::new(0);
pub(super) static CONFIG: ConfigSnapshot = ConfigSnapshot::new();

static SUPERVISOR: StaticCell<FirmwareSupervisor> = StaticCell::new();
static TRANSLATOR: StaticCell<FirmwareTranslator> = StaticCell::new();

#[embassy_executor::main]
pub async fn main(spawner: Spawner) {
    let _peripherals = hal::init(hal::Config::default());

    let config = platform::supervisor_config();
    let parts = platform::collaborators(
        SignalTimer::new(&TIMER_SIGNAL),
        OutboundPublisher::new(OUTBOUND.sender(), &DROPPED),
    );
    let supervisor = FirmwareSupervisor::new(parts, config).expect("supervisor configuration");
    let supervisor = SUPERVISOR.init(supervisor);
    let translator = TRANSLATOR.init(platform::translator(&config));

    defmt::info!(
        "supervisor: starting, {} connect retries, agps={} pgps={}",
        config.connect_retries,
        config.agps,
        config.pgps
    );

    spawner
        .spawn(supervisor_task::run(supervisor, &CONFIG, EVENT_QUEUE.receiver()))
        .expect("failed to spawn supervisor task");

    spawner
        .spawn(timer_task::run(
            &TIMER_SIGNAL,
            bus::router(&EVENT_QUEUE, &OUTBOUND, &DROPPED),
        ))
        .expect("failed to spawn connection timer task");

    spawner
        .spawn(bus_task::run(
            OUTBOUND.receiver(),
            OutboundPublisher::new(OUTBOUND.sender(), &DROPPED),
        ))
        .expect("failed to spawn outbound bus task");

    spawner
        .spawn(transport_task::run(
            translator,
            &CONFIG,
            NOTICES.receiver(),
            bus::router(&EVENT_QUEUE, &OUTBOUND, &DROPPED),
        ))
        .expect("failed to spawn transport task");

    core::future::pending::<()>().await;
}

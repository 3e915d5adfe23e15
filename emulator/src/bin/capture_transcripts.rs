use std::io;
use std::path::Path;

#[allow(dead_code)]
#[path = "../session.rs"]
mod session;

use session::Session;
use tracker_core::config::SupervisorConfig;

const TRANSCRIPT_DIR: &str = "transcripts";

fn main() -> io::Result<()> {
    record("backoff", SupervisorConfig::new(), BACKOFF)?;
    record("carrier-fota", SupervisorConfig::new(), CARRIER_FOTA)?;
    record(
        "unreachable",
        SupervisorConfig::new().with_connect_retries(2),
        UNREACHABLE,
    )?;
    record("pgps", SupervisorConfig::new(), PGPS)?;
    record("shutdown", SupervisorConfig::new(), SHUTDOWN)?;
    Ok(())
}

fn record(name: &str, config: SupervisorConfig, script: &[&str]) -> io::Result<()> {
    let path = Path::new(TRANSCRIPT_DIR).join(format!("{name}.log"));
    let mut session = Session::new(config, Some(&path))?;
    for line in script {
        session.handle_command(line)?;
    }
    Ok(())
}

const BACKOFF: &[&str] = &[
    "modem initialized",
    "modem lte-connected",
    "status",
    "tick 64",
    "tick 128",
    "cloud connected",
    "data send 1 120",
    "data batch 2 480",
    "status",
];

const CARRIER_FOTA: &[&str] = &[
    "modem initialized",
    "modem lte-connected",
    "cloud connected",
    "modem fota-pending",
    "data ui 3 12",
    "modem fota-stopped",
    "cloud connected",
    "data ui 4 12",
];

const UNREACHABLE: &[&str] = &[
    "fail connect",
    "modem initialized",
    "modem lte-connected",
    "tick 64",
    "tick 128",
    "tick 256",
    "status",
];

const PGPS: &[&str] = &[
    "modem initialized",
    "modem lte-connected",
    "cloud connected",
    "location pgps-request 42 240 19000 3600",
    "data date-time",
    "location agps-needed 42 240 19000 3600",
    "location pgps-available 7",
];

const SHUTDOWN: &[&str] = &[
    "modem initialized",
    "modem lte-connected",
    "shutdown",
    "cloud connected",
    "tick 600",
    "status",
];

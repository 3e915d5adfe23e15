mod session;

use std::env;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process;

use session::Session;
use tracker_core::config::SupervisorConfig;

struct Options {
    transcript: Option<PathBuf>,
    script: Option<PathBuf>,
    retries: Option<u8>,
}

fn main() -> io::Result<()> {
    let options = parse_options().unwrap_or_else(|err| {
        eprintln!("{err}");
        eprintln!(
            "Usage: tracker-emulator [--transcript <path>] [--retries <n>] [script]"
        );
        process::exit(2);
    });

    let mut config = SupervisorConfig::new();
    if let Some(retries) = options.retries {
        config = config.with_connect_retries(retries);
    }
    let mut session = Session::new(config, options.transcript.as_deref())?;

    let stdout = io::stdout();
    let mut writer = stdout.lock();

    if let Some(path) = options.script {
        let reader = BufReader::new(File::open(path)?);
        for line in reader.lines() {
            for response in session.handle_command(&line?)? {
                writeln!(writer, "{response}")?;
            }
        }
        return Ok(());
    }

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let mut line = String::new();

    writeln!(
        writer,
        "Tracker cloud supervisor emulator ready. Type `help` for commands or `exit` to quit."
    )?;

    loop {
        line.clear();
        write!(writer, "> ")?;
        writer.flush()?;

        let bytes_read = reader.read_line(&mut line)?;
        if bytes_read == 0 {
            writeln!(writer)?;
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if should_terminate(trimmed) {
            writeln!(writer, "Session closed.")?;
            break;
        }

        for response in session.handle_command(trimmed)? {
            writeln!(writer, "{response}")?;
        }
    }

    Ok(())
}

fn should_terminate(input: &str) -> bool {
    input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit")
}

fn parse_options() -> Result<Options, String> {
    let mut options = Options {
        transcript: None,
        script: None,
        retries: None,
    };
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--transcript" => {
                let value = args.next().ok_or("Expected path after --transcript")?;
                options.transcript = Some(PathBuf::from(value));
            }
            "--retries" => {
                let value = args.next().ok_or("Expected count after --retries")?;
                let retries = value
                    .parse()
                    .map_err(|_| format!("Invalid retry count `{value}`"))?;
                options.retries = Some(retries);
            }
            _ if arg.starts_with("--") => return Err(format!("Unknown option `{arg}`")),
            _ => options.script = Some(PathBuf::from(arg)),
        }
    }
    Ok(options)
}

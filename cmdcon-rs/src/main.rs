use log::{LevelFilter, Metadata, Record};

use cmdcon::cli;
use cmdcon::{Console, ConsoleConfig, FdSet};

// ── Debug logger ──────────────────────────────────────────────────────────────

/// Writes `log` records to stderr; installed by `-d`.
struct StderrLogger;

impl log::Log for StderrLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        eprintln!("cmdcon: [{}] {}", record.level(), record.args());
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

// ── Main loop ─────────────────────────────────────────────────────────────────

/// Read commands from standard input through the select-driven loop.
fn run_interactive(console: &mut Console) -> cmdcon::Result<bool> {
    console.push_stdin()?;
    while !console.is_done() {
        let mut readfds = FdSet::new();
        console.select(0, &mut readfds, None, None, None)?;
    }
    Ok(console.finish())
}

fn main() {
    let args = match cli::parse_args() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("cmdcon: {e}");
            eprintln!("Usage: cmdcon [-f<file>] [-l<logfile>] [-e<limit>] [-vnd]");
            std::process::exit(1);
        }
    };

    if args.debug && log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(LevelFilter::Debug);
    }

    let defaults = ConsoleConfig::default();
    let config = ConsoleConfig {
        echo: args.echo,
        error_limit: args.error_limit.unwrap_or(defaults.error_limit),
        ..defaults
    };
    let mut console = Console::new(config);

    if let Some(path) = &args.log {
        if let Err(e) = console.output_mut().start_log(path) {
            eprintln!("cmdcon: couldn't open log file '{}': {e}", path.display());
            std::process::exit(1);
        }
    }

    // ── Startup rc file ───────────────────────────────────────────────────────
    if !args.no_rc {
        if let Some(rc) = cli::find_user_config() {
            if let Err(e) = console.run_script(&rc) {
                eprintln!("cmdcon: warning: {e}");
            }
        }
    }

    let result = match args.batch.as_deref() {
        Some(path) => console.run_batch(Some(path)),
        None => run_interactive(&mut console),
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("cmdcon: {e}");
            std::process::exit(1);
        }
    }
}

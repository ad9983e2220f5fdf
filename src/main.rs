use intersection_sim::{
    LightEvent, LightObserver, LogObserver, Scenario, SimError, SimResult, Simulation,
};
use log::{LevelFilter, Log, Metadata, Record};
use std::process::ExitCode;

/// Prints every light change to stdout.
struct ConsoleObserver;

impl LightObserver for ConsoleObserver {
    fn on_transition(&self, event: &LightEvent) {
        println!("{}", event);
    }
}

/// Writes `info` and more severe log records to stderr, tagged with the thread name.
struct StderrLogger;

static LOGGER: StderrLogger = StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::Level::Info
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let thread = std::thread::current();
            eprintln!(
                "[{} {}] {}",
                record.level(),
                thread.name().unwrap_or("main"),
                record.args()
            );
        }
    }

    fn flush(&self) {}
}

/// Command line options: `[--log] [scenario.json]`.
#[derive(Default)]
struct Options {
    /// Report light changes through the `log` facade rather than stdout.
    log: bool,
    scenario: Option<String>,
}

impl Options {
    fn parse(args: impl IntoIterator<Item = String>) -> SimResult<Self> {
        let mut options = Options::default();
        for arg in args {
            if arg == "--log" {
                options.log = true;
            } else if arg.starts_with("--") {
                return Err(SimError::Config(format!("unknown option {}", arg)));
            } else if options.scenario.is_none() {
                options.scenario = Some(arg);
            } else {
                return Err(SimError::Config(format!("unexpected argument {}", arg)));
            }
        }
        Ok(options)
    }
}

fn run() -> SimResult<()> {
    let options = Options::parse(std::env::args().skip(1))?;
    let scenario = match options.scenario {
        Some(path) => Scenario::load(path)?,
        None => Scenario::demo(),
    };
    let sim = Simulation::from_scenario(scenario)?;

    if options.log {
        if log::set_logger(&LOGGER).is_ok() {
            log::set_max_level(LevelFilter::Info);
        }
        let report = sim.run(&LogObserver)?;
        log::info!("{}", report);
    } else {
        println!("Simulating {} arrivals...", sim.schedule().len());
        let report = sim.run(&ConsoleObserver)?;
        println!("{}", report);
    }
    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}

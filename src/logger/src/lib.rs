use std::time::Instant;

use once_cell::sync::OnceCell;

pub use log::*;

static LOGGER: Logger = Logger;
static START: OnceCell<Instant> = OnceCell::new();

pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
    START.get_or_init(Instant::now);
    set_logger(&LOGGER).map(|()| set_max_level(level))
}

// level_from_env reads a level name such as "debug" from `var`. An unset or
// unparsable value turns logging off.
pub fn level_from_env(var: &str) -> LevelFilter {
    std::env::var(var)
        .ok()
        .and_then(|level| level.parse().ok())
        .unwrap_or(LevelFilter::Off)
}

#[derive(Copy, Clone)]
struct Logger;

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= max_level()
    }
    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let elapsed = START.get().map(|s| s.elapsed().as_secs_f64()).unwrap_or(0.0);
        eprintln!(
            "[{:>10.6} {:<5} {}] {}",
            elapsed,
            record.level(),
            record.target(),
            record.args()
        );
    }
    fn flush(&self) {}
}

use std::io::{self, Write};

use colored::Colorize;
use log::{Level, LevelFilter, Metadata, Record, SetLoggerError};

/// Coloured stderr logger for the command line tool.
#[derive(Clone, Copy)]
pub struct ColorLogger {
    max_level: LevelFilter,
}

impl ColorLogger {
    pub fn new(quiet: bool, verbose: bool) -> Self {
        let max_level = if quiet {
            LevelFilter::Off
        } else if verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        };
        Self { max_level }
    }

    pub fn init(self) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(self))?;
        log::set_max_level(self.max_level);
        Ok(())
    }
}

impl log::Log for ColorLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        match record.level() {
            Level::Error => eprintln!(
                "{} {}",
                "[ERROR]".red().bold(),
                record.args().to_string().red().bold()
            ),
            Level::Warn => eprintln!(
                "{} {}",
                "[WARN]".yellow().bold(),
                record.args().to_string().yellow().bold()
            ),
            _ => eprintln!("[{}] {}", record.level().to_string().blue(), record.args()),
        }
        self.flush();
    }

    fn flush(&self) {
        let _ = io::stderr().flush();
    }
}

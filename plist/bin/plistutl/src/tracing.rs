use std::io::{self, Stderr};

use clap::{ArgAction, Args};
use tracing_subscriber::{
    filter::{EnvFilter, LevelFilter},
    fmt,
    prelude::*,
};

#[derive(Args, Clone, Debug)]
pub(crate) struct TracingConfig {
    #[arg(
        long,
        short = 'v',
        action = ArgAction::Count,
        global = true,
        help = "Make tracing output more verbose",
    )]
    verbose: u8,
    #[arg(
        long,
        action = ArgAction::Count,
        global = true,
        help = "Make tracing output less verbose",
    )]
    silent: u8,
}

const OFF: i16 = -3;
const ERROR: i16 = -2;
const WARN: i16 = -1;
const INFO: i16 = 0;
const DEBUG: i16 = 1;
const TRACE: i16 = 2;

const WRITER: fn() -> Stderr = io::stderr;

impl TracingConfig {
    pub(crate) fn init(&self) {
        let layer = fmt::layer()
            .compact()
            .with_ansi(self.level() >= DEBUG)
            .with_file(self.level() >= TRACE)
            .with_line_number(true)
            .with_target(true)
            .with_writer(WRITER)
            .with_filter(self.env_filter());
        tracing_subscriber::registry().with(layer).init();
    }

    fn level(&self) -> i16 {
        i16::from(self.verbose).saturating_sub(i16::from(self.silent))
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::builder()
            .with_default_directive(self.level_filter().into())
            .from_env_lossy()
    }

    fn level_filter(&self) -> LevelFilter {
        match self.level() {
            level if level <= OFF => LevelFilter::OFF,
            ERROR => LevelFilter::ERROR,
            WARN => LevelFilter::WARN,
            INFO => LevelFilter::INFO,
            DEBUG => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_filter() {
        fn test(verbose: u8, silent: u8, expect: LevelFilter) {
            assert_eq!(TracingConfig { verbose, silent }.level_filter(), expect);
        }

        test(0, 0, LevelFilter::INFO);
        test(1, 0, LevelFilter::DEBUG);
        test(2, 0, LevelFilter::TRACE);
        test(9, 0, LevelFilter::TRACE);
        test(0, 1, LevelFilter::WARN);
        test(0, 2, LevelFilter::ERROR);
        test(0, 3, LevelFilter::OFF);
        test(0, 9, LevelFilter::OFF);
        test(2, 1, LevelFilter::DEBUG);
    }
}

use std::io::Write;

use gantry_runtime::ops::SCRIPT_LOG_TARGET;
use log::{Level, LevelFilter};

/// Filters for host crates and for script console output
///
/// Script output stays visible at the default verbosity, and under `-q` only
/// its warnings and errors are kept.
fn filters(quiet: bool, verbose: u8) -> (LevelFilter, LevelFilter) {
    match (quiet, verbose) {
        (true, _) => (LevelFilter::Error, LevelFilter::Warn),
        (false, 0) => (LevelFilter::Info, LevelFilter::Info),
        (false, 1) => (LevelFilter::Debug, LevelFilter::Debug),
        (false, _) => (LevelFilter::Trace, LevelFilter::Trace),
    }
}

pub(crate) fn init_logger(quiet: bool, verbose: u8) {
    let (host, script) = filters(quiet, verbose);

    let mut builder = env_logger::builder();
    if host == LevelFilter::Trace {
        builder.filter_level(host);
    } else {
        builder.filter_module("gantry", host);
    }
    builder
        .filter_module(SCRIPT_LOG_TARGET, script)
        .format(move |buf, record| {
            let style = buf.default_level_style(record.level());
            if record.target() == SCRIPT_LOG_TARGET {
                writeln!(buf, "{style}[script]{style:#} {}", record.args())
            } else if record.level() == Level::Info && verbose == 0 {
                writeln!(buf, "{}", record.args())
            } else if verbose == 0 {
                writeln!(buf, "{style}[{}]{style:#} {}", record.level(), record.args())
            } else {
                writeln!(
                    buf,
                    "{style}[{}]{style:#} {}: {}",
                    record.level(),
                    record.target(),
                    record.args()
                )
            }
        });

    let _ = builder.try_init();
}

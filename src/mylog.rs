use ::simplelog::*;

pub fn level_for_verbosity(log_level: u32) -> LevelFilter {
    match log_level {
        0 => LevelFilter::Error,
        1 => LevelFilter::Warn,
        2 => LevelFilter::Info,
        3 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

pub fn configure_logging(log_level: u32) -> ::std::result::Result<(), ::log::SetLoggerError> {
    TermLogger::init(
        level_for_verbosity(log_level),
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )
}

#[test]
fn test_verbosity_levels() {
    assert_eq!(level_for_verbosity(0), LevelFilter::Error);
    assert_eq!(level_for_verbosity(2), LevelFilter::Info);
    assert_eq!(level_for_verbosity(9), LevelFilter::Trace);
}

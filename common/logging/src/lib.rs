use slog::{o, Discard, Logger};
use sloggers::{null::NullLoggerBuilder, terminal::TerminalLoggerBuilder, types::Severity, Build};

/// Return a logger suitable for test usage.
///
/// By default no logs will be printed, but they can be enabled via the `test_logger` feature:
///
/// ```bash
/// $ cargo test -p execution_layer merge_transition --features 'logging/test_logger'
/// ```
pub fn test_logger() -> Logger {
    let logger = if cfg!(feature = "test_logger") {
        TerminalLoggerBuilder::new().level(Severity::Debug).build()
    } else {
        NullLoggerBuilder.build()
    };

    logger.unwrap_or_else(|_| null_logger())
}

/// A logger that drops every record.
pub fn null_logger() -> Logger {
    Logger::root(Discard, o!())
}

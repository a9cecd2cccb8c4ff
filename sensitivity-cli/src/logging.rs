//! Logger installation for the command-line interface.

use flexi_logger::{Logger, LoggerHandle};

use crate::CliError;

/// Level specification used when `RUST_LOG` is unset.
pub(crate) const DEFAULT_LOG_SPEC: &str = "info";

/// Install a stderr logger configured from `RUST_LOG`.
///
/// The returned handle must stay alive for as long as records are emitted.
pub(crate) fn init() -> Result<LoggerHandle, CliError> {
    Ok(Logger::try_with_env_or_str(DEFAULT_LOG_SPEC)?
        .log_to_stderr()
        .start()?)
}

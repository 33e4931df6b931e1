// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Process-wide bridge from the `log` facade to an [`Output`].

use super::output::{LogLevel, Output};
use std::io;
use std::sync::{Arc, OnceLock};

static BRIDGE: OnceLock<LogBridge> = OnceLock::new();

/// `log::Log` implementation forwarding records to the configured output.
struct LogBridge {
    output: Arc<dyn Output>,
    level: LogLevel,
}

impl log::Log for LogBridge {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        LogLevel::from(metadata.level()) >= self.level
    }

    fn log(&self, record: &log::Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let message = record.args().to_string();
        // A failing sink must never take the caller down.
        let _ = self
            .output
            .write(LogLevel::from(record.level()), record.target(), &message);
    }

    fn flush(&self) {
        let _ = self.output.flush();
    }
}

/// Install `output` as the destination of every `log::` record at `level` or above.
///
/// Only the first call wins. Later calls, or a call made after another `log`
/// backend has been installed, are ignored.
///
/// ```ignore
/// use parcel_rpc::logging::{init_logger, ConsoleOutput, LogLevel};
/// use std::sync::Arc;
///
/// init_logger(Arc::new(ConsoleOutput::new(LogLevel::Debug)), LogLevel::Debug);
/// ```
pub fn init_logger(output: Arc<dyn Output>, level: LogLevel) {
    let mut first = false;
    let bridge = BRIDGE.get_or_init(|| {
        first = true;
        LogBridge { output, level }
    });
    if !first {
        return;
    }
    if log::set_logger(bridge).is_ok() {
        log::set_max_level(level.to_filter());
    }
}

/// Flush the installed output. No-op before `init_logger`.
pub fn flush_logger() -> io::Result<()> {
    match BRIDGE.get() {
        Some(bridge) => bridge.output.flush(),
        None => Ok(()),
    }
}

/// True once `init_logger` has run.
pub fn is_initialized() -> bool {
    BRIDGE.get().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flush_before_init_is_noop() {
        // May run before or after another test initialized the bridge.
        assert!(flush_logger().is_ok());
    }
}

// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Log sinks for the `log` facade.
//!
//! Library code logs through `log::debug!` / `log::warn!` and friends.
//! Applications that do not bring their own `log` backend can route those
//! records to stderr or a file:
//!
//! ```ignore
//! use parcel_rpc::logging::{init_logger, FileOutput, LogLevel};
//! use std::sync::Arc;
//!
//! let file = FileOutput::new("/tmp/parcel-rpc.log", LogLevel::Info)?;
//! init_logger(Arc::new(file), LogLevel::Info);
//! ```

pub mod logger;
mod output;

pub use logger::{flush_logger, init_logger, is_initialized};
pub use output::{ConsoleOutput, FileOutput, LogLevel, Output};

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::io;
    use std::sync::Arc;

    struct Capture(Mutex<Vec<String>>);

    impl Output for Capture {
        fn write(&self, level: LogLevel, target: &str, message: &str) -> io::Result<()> {
            self.0
                .lock()
                .push(format!("{} {} {}", level.as_str().trim(), target, message));
            Ok(())
        }

        fn flush(&self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_init_routes_facade_records() {
        let capture = Arc::new(Capture(Mutex::new(Vec::new())));
        init_logger(capture.clone(), LogLevel::Info);
        // Second init is ignored.
        init_logger(Arc::new(ConsoleOutput::new(LogLevel::Debug)), LogLevel::Debug);
        assert!(is_initialized());

        log::debug!(target: "bridge_test", "filtered");
        log::warn!(target: "bridge_test", "kept {}", 7);
        assert!(flush_logger().is_ok());

        let lines = capture.0.lock();
        let ours: Vec<&String> = lines.iter().filter(|l| l.contains("bridge_test")).collect();
        // Another test binary may own the global logger; only check when ours won.
        if !ours.is_empty() {
            assert_eq!(ours.len(), 1);
            assert_eq!(ours[0], "WARN bridge_test kept 7");
        }
    }
}

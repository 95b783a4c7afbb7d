//! Process-wide logger.
//!
//! A thin convenience over one explicitly initialised [`Logger`]. Components
//! that can take a handle should; these functions exist for call sites that
//! cannot thread one through.

use std::fmt;
use std::sync::{Arc, OnceLock};

use super::Logger;

static GLOBAL: OnceLock<Arc<Logger>> = OnceLock::new();

/// Install the process-wide logger.
///
/// Only the first call has an effect; later calls return `false` and leave
/// the installed logger untouched.
pub fn init(logger: Arc<Logger>) -> bool {
    let mut installed = false;
    GLOBAL.get_or_init(|| {
        installed = true;
        logger
    });
    installed
}

/// The installed logger, if [`init`] has run.
pub fn get() -> Option<&'static Arc<Logger>> {
    GLOBAL.get()
}

pub fn info(message: &str) {
    if let Some(logger) = get() {
        if let Err(e) = logger.log(message) {
            tracing::warn!(error = %e, "dropped info log line");
        }
    }
}

pub fn warn(message: &str) {
    if let Some(logger) = get() {
        if let Err(e) = logger.log_warning(message) {
            tracing::warn!(error = %e, "dropped warning log line");
        }
    }
}

pub fn error(err: &dyn fmt::Display) {
    if let Some(logger) = get() {
        if let Err(e) = logger.log_error(err) {
            tracing::warn!(error = %e, "dropped error log line");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::{Identity, LineFormat, SharedBuffer, Sink};

    // The global is shared by every test in this binary, so all assertions
    // about it live in one test.
    #[test]
    fn test_init_is_once() {
        let first = SharedBuffer::new();
        let second = SharedBuffer::new();
        let make = |buffer: &SharedBuffer| {
            Arc::new(Logger::new(
                Identity::new("global", ""),
                LineFormat::Plain,
                Sink::buffer(buffer),
            ))
        };

        assert!(init(make(&first)));
        assert!(!init(make(&second)));

        info("hello");
        warn("careful");
        error(&"broken");

        let lines = first.lines();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with("[global] hello"));
        assert!(lines[1].ends_with("[global] warning: careful"));
        assert!(lines[2].ends_with("[global] error: broken"));
        assert!(second.is_empty());
        assert!(get().is_some());
    }
}

//! Caller-aware logger.
//!
//! Every consumer gets its own [`TracingLogger`] (the service is
//! transient), prefixed with the origin and name of whoever asked for it:
//!
//! ```text
//! [Si][SceneReferences] HealthBar is not registered
//! [Mo][Player] spawned at (3, 4)
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use khidma_container::{CallerMetadata, OriginKind};
use tracing::{error, info, warn};

use crate::Injectable;

/// Logging contract handed to services and injection targets.
pub trait Logger: Send + Sync {
    fn log(&self, message: &str);

    fn warn(&self, message: &str);

    fn error(&self, message: &str);

    /// The `[origin][name]` prefix put in front of every message.
    fn prefix(&self) -> &str;

    /// Silences (or re-enables) this logger.
    fn set_disabled(&self, disabled: bool);

    fn is_disabled(&self) -> bool;
}

/// [`Logger`] forwarding to `tracing`.
#[derive(Debug, Default, Injectable)]
#[injectable(entry = "inject")]
pub struct TracingLogger {
    prefix: String,
    disabled: AtomicBool,
}

impl TracingLogger {
    /// A logger with an explicit caller, for use outside the container.
    pub fn for_caller(caller: &CallerMetadata) -> Self {
        let mut logger = Self::default();
        logger.describe(caller);
        logger
    }

    fn inject(&mut self, caller: Arc<CallerMetadata>) {
        self.describe(&caller);
    }

    fn describe(&mut self, caller: &CallerMetadata) {
        self.prefix = format!("[{}][{}]", origin_tag(caller.origin()), caller.name());
    }
}

fn origin_tag(origin: OriginKind) -> &'static str {
    match origin {
        OriginKind::Object => "Mo",
        OriginKind::System => "Sy",
        OriginKind::Singleton => "Si",
        OriginKind::Scoped => "Sc",
        OriginKind::Unknown => "??",
    }
}

impl Logger for TracingLogger {
    fn log(&self, message: &str) {
        if self.is_disabled() {
            return;
        }
        info!("{} {}", self.prefix, message);
    }

    fn warn(&self, message: &str) {
        if self.is_disabled() {
            return;
        }
        warn!("{} {}", self.prefix, message);
    }

    fn error(&self, message: &str) {
        if self.is_disabled() {
            return;
        }
        error!("{} {}", self.prefix, message);
    }

    fn prefix(&self) -> &str {
        &self.prefix
    }

    fn set_disabled(&self, disabled: bool) {
        self.disabled.store(disabled, Ordering::Relaxed);
    }

    fn is_disabled(&self) -> bool {
        self.disabled.load(Ordering::Relaxed)
    }
}

//! tracing subscriber setup with a runtime-switchable filter.

use std::sync::Arc;

use tracing_subscriber::{
    fmt, layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry,
};

use crate::error::{ExamError, Result};

/// Filter applied to this crate's targets while debug logging is switched on.
const DEBUG_DIRECTIVE: &str = "popm_exam=debug";

/// Map a `-v` count to a base filter. `RUST_LOG` wins when set.
pub fn filter_for(verbosity: u8) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    match verbosity {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    }
}

/// Handle for changing the log filter after start-up.
#[derive(Clone)]
pub struct LogControl {
    handle: reload::Handle<EnvFilter, Registry>,
    base: String,
    // Keeps the filter alive when no subscriber owns it.
    _unattached: Option<Arc<reload::Layer<EnvFilter, Registry>>>,
}

impl LogControl {
    /// Turn this crate's debug output on or off, leaving the base filter intact.
    pub fn set_debug(&self, enabled: bool) -> Result<()> {
        let filter = if enabled {
            EnvFilter::try_new(format!("{},{}", self.base, DEBUG_DIRECTIVE))
        } else {
            EnvFilter::try_new(&self.base)
        }
        .map_err(|e| ExamError::Other(format!("invalid log filter: {}", e)))?;

        self.handle
            .reload(filter)
            .map_err(|e| ExamError::Other(format!("failed to update log filter: {}", e)))
    }

    pub fn is_debug(&self) -> bool {
        self.handle
            .with_current(|f| f.to_string().contains(DEBUG_DIRECTIVE))
            .unwrap_or(false)
    }
}

impl std::fmt::Debug for LogControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogControl").field("base", &self.base).finish()
    }
}

/// Install the global subscriber. Call once, from the binary.
pub fn init(verbosity: u8) -> Result<LogControl> {
    let filter = filter_for(verbosity);
    let base = filter.to_string();
    let (layer, handle) = reload::Layer::new(filter);

    tracing_subscriber::registry()
        .with(layer)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .try_init()
        .map_err(|e| ExamError::Other(format!("failed to install logger: {}", e)))?;

    Ok(LogControl {
        handle,
        base,
        _unattached: None,
    })
}

/// A [`LogControl`] that is not installed as the global subscriber.
///
/// Lets the shell be driven in tests without touching global state.
pub fn detached(verbosity: u8) -> LogControl {
    let filter = filter_for(verbosity);
    let base = filter.to_string();
    let (layer, handle) = reload::Layer::<EnvFilter, Registry>::new(filter);
    LogControl {
        handle,
        base,
        _unattached: Some(Arc::new(layer)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detached_control_toggles_debug() {
        let control = detached(0);
        assert!(!control.is_debug());
        control.set_debug(true).unwrap();
        assert!(control.is_debug());
        control.set_debug(false).unwrap();
        assert!(!control.is_debug());
    }
}

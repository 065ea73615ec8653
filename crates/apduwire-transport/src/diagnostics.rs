//! Raw byte observation for debugging.
//!
//! A [`DiagnosticsHook`] sees every outbound buffer before it is written and
//! every inbound buffer before it is decoded. Hooks only observe: they cannot
//! alter the bytes or the outcome of an exchange.

use std::fmt;
use std::sync::Arc;

/// Target used by [`TracingHook`] so wire dumps can be filtered separately.
pub const WIRE_TARGET: &str = "apduwire::wire";

/// Direction of a raw buffer relative to the local side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Outbound,
    Inbound,
}

impl Direction {
    /// Arrow used in byte dumps.
    pub fn arrow(self) -> &'static str {
        match self {
            Direction::Outbound => "->",
            Direction::Inbound => "<-",
        }
    }
}

/// Observer of raw wire bytes.
pub trait DiagnosticsHook: Send + Sync {
    /// Called with every buffer written to or read from the stream.
    fn observe(&self, direction: Direction, bytes: &[u8]);
}

/// Logs each buffer as hex through `tracing` at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingHook;

impl DiagnosticsHook for TracingHook {
    fn observe(&self, direction: Direction, bytes: &[u8]) {
        tracing::debug!(target: WIRE_TARGET, "{} {}", direction.arrow(), HexBytes(bytes));
    }
}

/// Formats a byte slice as contiguous lowercase hex.
pub struct HexBytes<'a>(pub &'a [u8]);

impl fmt::Display for HexBytes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for HexBytes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// A hook plus the switch that gates it.
///
/// The switch is plain configuration owned by the caller; the I/O path only
/// reads it.
#[derive(Clone)]
pub struct Diagnostics {
    hook: Arc<dyn DiagnosticsHook>,
    enabled: bool,
}

impl Diagnostics {
    /// Wrap a hook, initially disabled.
    pub fn new(hook: Arc<dyn DiagnosticsHook>) -> Self {
        Self {
            hook,
            enabled: false,
        }
    }

    /// Tracing-backed diagnostics, initially disabled.
    pub fn tracing() -> Self {
        Self::new(Arc::new(TracingHook))
    }

    /// Enable or disable the hook.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Builder-style variant of [`Diagnostics::set_enabled`].
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Whether the hook currently receives buffers.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Hand a buffer to the hook if enabled.
    pub fn observe(&self, direction: Direction, bytes: &[u8]) {
        if self.enabled {
            self.hook.observe(direction, bytes);
        }
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::tracing()
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics")
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<(Direction, Vec<u8>)>>,
    }

    impl DiagnosticsHook for Recorder {
        fn observe(&self, direction: Direction, bytes: &[u8]) {
            self.seen.lock().unwrap().push((direction, bytes.to_vec()));
        }
    }

    #[test]
    fn hex_formatting() {
        assert_eq!(HexBytes(&[0x00, 0x0a, 0xff]).to_string(), "000aff");
        assert_eq!(HexBytes(&[]).to_string(), "");
    }

    #[test]
    fn arrows_match_direction() {
        assert_eq!(Direction::Outbound.arrow(), "->");
        assert_eq!(Direction::Inbound.arrow(), "<-");
    }

    #[test]
    fn disabled_hook_sees_nothing() {
        let recorder = Arc::new(Recorder::default());
        let diagnostics = Diagnostics::new(recorder.clone());

        diagnostics.observe(Direction::Outbound, b"abc");
        assert!(recorder.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn enabled_hook_sees_buffers_in_order() {
        let recorder = Arc::new(Recorder::default());
        let mut diagnostics = Diagnostics::new(recorder.clone());
        diagnostics.set_enabled(true);

        diagnostics.observe(Direction::Outbound, &[1, 2]);
        diagnostics.observe(Direction::Inbound, &[3]);

        let seen = recorder.seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                (Direction::Outbound, vec![1, 2]),
                (Direction::Inbound, vec![3])
            ]
        );
    }

    #[test]
    fn toggling_off_stops_delivery() {
        let recorder = Arc::new(Recorder::default());
        let mut diagnostics = Diagnostics::new(recorder.clone()).enabled(true);

        diagnostics.observe(Direction::Inbound, &[1]);
        diagnostics.set_enabled(false);
        diagnostics.observe(Direction::Inbound, &[2]);

        assert_eq!(recorder.seen.lock().unwrap().len(), 1);
    }
}

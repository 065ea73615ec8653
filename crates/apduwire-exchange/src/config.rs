use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use apduwire_frame::DEFAULT_MAX_PAYLOAD;
use apduwire_transport::{Diagnostics, DiagnosticsHook};

/// Default idle timeout and exchange deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for a [`TcpTransport`](crate::TcpTransport).
#[derive(Clone)]
pub struct TransportConfig {
    /// Connect deadline and per-exchange deadline.
    pub timeout: Duration,
    /// Largest response payload accepted from the peer.
    pub max_response_payload: usize,
    /// Drop bytes left over from an earlier exchange before writing a new
    /// request. Disabling this lets a late response be read as the answer to
    /// the next request.
    pub discard_late_responses: bool,
    /// Start with raw byte diagnostics enabled.
    pub verbose: bool,
    /// Hook that receives raw bytes when verbose. `None` logs through tracing.
    pub diagnostics_hook: Option<Arc<dyn DiagnosticsHook>>,
}

impl TransportConfig {
    /// Override the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the maximum response payload size.
    pub fn with_max_response_payload(mut self, max: usize) -> Self {
        self.max_response_payload = max;
        self
    }

    /// Choose whether late responses are discarded.
    pub fn with_discard_late_responses(mut self, discard: bool) -> Self {
        self.discard_late_responses = discard;
        self
    }

    /// Start verbose.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Inject a diagnostics hook.
    pub fn with_diagnostics_hook(mut self, hook: Arc<dyn DiagnosticsHook>) -> Self {
        self.diagnostics_hook = Some(hook);
        self
    }

    pub(crate) fn diagnostics(&self) -> Diagnostics {
        let diagnostics = match &self.diagnostics_hook {
            Some(hook) => Diagnostics::new(Arc::clone(hook)),
            None => Diagnostics::tracing(),
        };
        diagnostics.enabled(self.verbose)
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_response_payload: DEFAULT_MAX_PAYLOAD,
            discard_late_responses: true,
            verbose: false,
            diagnostics_hook: None,
        }
    }
}

impl fmt::Debug for TransportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportConfig")
            .field("timeout", &self.timeout)
            .field("max_response_payload", &self.max_response_payload)
            .field("discard_late_responses", &self.discard_late_responses)
            .field("verbose", &self.verbose)
            .field(
                "diagnostics_hook",
                &if self.diagnostics_hook.is_some() {
                    "custom"
                } else {
                    "tracing"
                },
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = TransportConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.max_response_payload, DEFAULT_MAX_PAYLOAD);
        assert!(config.discard_late_responses);
        assert!(!config.verbose);
        assert!(!config.diagnostics().is_enabled());
    }

    #[test]
    fn builder_overrides() {
        let config = TransportConfig::default()
            .with_timeout(Duration::from_millis(250))
            .with_max_response_payload(64)
            .with_discard_late_responses(false)
            .with_verbose(true);

        assert_eq!(config.timeout, Duration::from_millis(250));
        assert_eq!(config.max_response_payload, 64);
        assert!(!config.discard_late_responses);
        assert!(config.diagnostics().is_enabled());
    }

    #[test]
    fn debug_output_names_hook_kind() {
        let rendered = format!("{:?}", TransportConfig::default());
        assert!(rendered.contains("diagnostics_hook: \"tracing\""));
    }
}

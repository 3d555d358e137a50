use std::time::Duration;

/// Name the `open` request announces when the caller does not pick one.
pub const DEFAULT_TARGET: &str = "lasfile";

/// Configuration for a [`LasFile`](crate::LasFile) and its loader.
///
/// ```text
/// ┌─────────────────┬──────────────────────────────────────────────────┐
/// │ Field           │ Purpose                                          │
/// ├─────────────────┼──────────────────────────────────────────────────┤
/// │ request_timeout │ Upper bound on a pending decoder request         │
/// │ target          │ File name sent with the decoder `open` request   │
/// └─────────────────┴──────────────────────────────────────────────────┘
/// ```
///
/// Only the compressed path talks to the decoder, so both fields are
/// ignored for uncompressed files.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoaderConfig {
    /// When `Some`, a request with no matching response after this long
    /// fails with [`ChannelError::Timeout`](crate::ChannelError::Timeout)
    /// and its correlation entry is dropped. When `None`, the request
    /// waits until the decoder answers or its endpoint goes away.
    pub request_timeout: Option<Duration>,

    /// Name the external decoder files the buffer under.
    pub target: String,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            request_timeout: None,
            target: DEFAULT_TARGET.to_string(),
        }
    }
}

impl LoaderConfig {
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }
}

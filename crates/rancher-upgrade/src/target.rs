//! Service target references.

/// The service an upgrade run operates on.
///
/// Parsed from the raw `--service` flag value: `name` looks the service
/// up by name across the whole project, `stack/name` scopes the lookup
/// to one stack. The environment name, when given, narrows only the
/// stack lookup and is never applied to the service query itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Stack the service must belong to, when the reference names one.
    pub stack: Option<String>,
    /// Service name to match.
    pub service: String,
    /// Environment filter for the stack lookup.
    pub env: Option<String>,
}

impl Target {
    /// Parse a target reference.
    ///
    /// Splits on the first `/` only; everything after it is taken as
    /// the service name verbatim, so degenerate inputs like `stack/` or
    /// `a/b/c` pass through and simply match nothing server-side.
    pub fn parse(reference: &str, env: Option<String>) -> Self {
        match reference.split_once('/') {
            Some((stack, service)) => Self {
                stack: Some(stack.to_string()),
                service: service.to_string(),
                env,
            },
            None => Self {
                stack: None,
                service: reference.to_string(),
                env,
            },
        }
    }

    /// `true` when the reference names a stack.
    pub fn is_stack_scoped(&self) -> bool {
        self.stack.is_some()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

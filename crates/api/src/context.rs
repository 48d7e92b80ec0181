//! Request-scoped execution context.

/// Carries cross-cutting request metadata (e.g. the caller-supplied request
/// id) so handlers and services don't grow extra parameters for it.
///
/// One instance per request, inserted by the context middleware.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    request_id: String,
}

impl ExecutionContext {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
        }
    }

    /// Caller-supplied `x-request-id`; empty when absent.
    pub fn request_id(&self) -> &str {
        &self.request_id
    }
}

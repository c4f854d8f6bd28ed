/// Failure to make a graphics context current.
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("no display connection is available")]
    NoDisplay,
    #[error("failed to create graphics context: {0}")]
    Create(String),
    #[error("failed to make graphics context current: {0}")]
    MakeCurrent(String),
}

/// Owner of the platform graphics context (EGL, GLX, ...).
pub trait ContextManager {
    /// Guarantees a valid context is current on the calling thread, creating
    /// one when necessary.
    fn require_context(&mut self) -> Result<(), ContextError>;

    fn has_context(&self) -> bool;
}

/// Context manager with no platform behind it.
///
/// It tracks whether a context "exists" and how many times one was required,
/// which is all the coordinator observes.
#[derive(Debug, Default)]
pub struct HeadlessContext {
    alive: bool,
    created: usize,
    required: usize,
    fail_next: Option<String>,
}

impl HeadlessContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates context loss; the next `require_context` recreates it.
    pub fn lose_context(&mut self) {
        self.alive = false;
    }

    /// Makes the next `require_context` fail with `reason`.
    pub fn fail_next(&mut self, reason: impl Into<String>) {
        self.fail_next = Some(reason.into());
    }

    pub fn contexts_created(&self) -> usize {
        self.created
    }

    pub fn times_required(&self) -> usize {
        self.required
    }
}

impl ContextManager for HeadlessContext {
    fn require_context(&mut self) -> Result<(), ContextError> {
        self.required += 1;
        if let Some(reason) = self.fail_next.take() {
            return Err(ContextError::MakeCurrent(reason));
        }
        if !self.alive {
            self.alive = true;
            self.created += 1;
            tracing::debug!(generation = self.created, "headless context created");
        }
        Ok(())
    }

    fn has_context(&self) -> bool {
        self.alive
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recreates_after_loss() {
        let mut context = HeadlessContext::new();
        context.require_context().unwrap();
        context.require_context().unwrap();
        assert_eq!(context.contexts_created(), 1);

        context.lose_context();
        assert!(!context.has_context());
        context.require_context().unwrap();
        assert_eq!(context.contexts_created(), 2);
        assert_eq!(context.times_required(), 3);
    }

    #[test]
    fn injected_failure_is_reported_once() {
        let mut context = HeadlessContext::new();
        context.fail_next("surface lost");
        let err = context.require_context().unwrap_err();
        assert!(err.to_string().contains("surface lost"));
        assert!(context.require_context().is_ok());
    }
}

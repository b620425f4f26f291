//! The per-call circular-reference guard.

use crate::error::ResolveError;

/// Chain of specs currently being resolved by one top-level call.
///
/// Threaded explicitly through the resolver call chain instead of
/// living in thread-local state, so reentrancy is visible in the
/// signatures and tests can drive it directly. The context is created
/// by the top-level `resolve` and dropped when that call returns, which
/// clears the guard on success and failure alike.
#[derive(Debug, Default)]
pub struct ResolutionContext {
    chain: Vec<String>,
}

impl ResolutionContext {
    /// An empty context for one top-level resolution.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `spec` is now being resolved.
    ///
    /// # Errors
    ///
    /// [`ResolveError::CircularReference`] when `spec` is already on
    /// the chain; the error carries the chain seen so far.
    pub fn enter(&mut self, spec: &str) -> Result<(), ResolveError> {
        if self.chain.iter().any(|seen| seen == spec) {
            return Err(ResolveError::CircularReference {
                spec: spec.to_string(),
                chain: self.chain.clone(),
            });
        }
        self.chain.push(spec.to_string());
        Ok(())
    }

    /// The specs seen so far, outermost first.
    #[must_use]
    pub fn chain(&self) -> &[String] {
        &self.chain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revisiting_a_spec_fails_with_the_chain() {
        let mut cx = ResolutionContext::new();
        cx.enter("named:a").unwrap();
        cx.enter("named:b").unwrap();

        let err = cx.enter("named:a").unwrap_err();
        match err {
            ResolveError::CircularReference { spec, chain } => {
                assert_eq!(spec, "named:a");
                assert_eq!(chain, ["named:a", "named:b"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn fresh_context_carries_nothing_over() {
        {
            let mut cx = ResolutionContext::new();
            cx.enter("named:a").unwrap();
        }
        let mut cx = ResolutionContext::new();
        assert!(cx.enter("named:a").is_ok());
    }
}

//! In-process hooks that rewrite the claim set before tokenization.

use super::Claims;
use crate::client::ClientId;
use std::fmt;
use std::sync::Arc;

/// Mutable view handed to each extension.
#[derive(Debug)]
pub struct ClaimsContext<'a> {
    /// Client the token is issued for
    pub client_id: &'a ClientId,
    /// Authenticated subject
    pub subject: &'a str,
    /// In-flight claims; extensions may add, replace, remove or swap them out
    pub claims: Claims,
}

/// Synchronous claim rewriting hook.
pub trait ClaimsExtension: Send + Sync {
    /// Rewrite `ctx.claims`.
    fn apply(&self, ctx: &mut ClaimsContext<'_>);
}

impl<F> ClaimsExtension for F
where
    F: Fn(&mut ClaimsContext<'_>) + Send + Sync,
{
    fn apply(&self, ctx: &mut ClaimsContext<'_>) {
        self(ctx);
    }
}

/// Ordered list of extensions, run in registration order.
#[derive(Clone, Default)]
pub struct Extensions {
    handlers: Vec<Arc<dyn ClaimsExtension>>,
}

impl Extensions {
    /// Empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler.
    #[must_use]
    pub fn with(mut self, handler: impl ClaimsExtension + 'static) -> Self {
        self.handlers.push(Arc::new(handler));
        self
    }

    /// Number of handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether no handler is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Run every handler over `claims` and return the result.
    #[must_use]
    pub fn run(&self, client_id: &ClientId, subject: &str, claims: Claims) -> Claims {
        let mut ctx = ClaimsContext {
            client_id,
            subject,
            claims,
        };
        for handler in &self.handlers {
            handler.apply(&mut ctx);
        }
        ctx.claims
    }
}

impl fmt::Debug for Extensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extensions")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_handlers_run_in_order() {
        let extensions = Extensions::new()
            .with(|ctx: &mut ClaimsContext<'_>| {
                ctx.claims.insert("step".to_string(), json!(1));
            })
            .with(|ctx: &mut ClaimsContext<'_>| {
                let step = ctx.claims["step"].as_i64().unwrap_or_default();
                ctx.claims.insert("step".to_string(), json!(step + 1));
            });

        let claims = extensions.run(&ClientId::generate(), "u1", Claims::new());
        assert_eq!(claims["step"], json!(2));
        assert_eq!(extensions.len(), 2);
    }

    #[test]
    fn test_handler_can_replace_claims() {
        let extensions = Extensions::new().with(|ctx: &mut ClaimsContext<'_>| {
            let mut fresh = Claims::new();
            fresh.insert("who".to_string(), json!(ctx.subject));
            ctx.claims = fresh;
        });

        let mut claims = Claims::new();
        claims.insert("drop".to_string(), json!(true));
        let claims = extensions.run(&ClientId::generate(), "u1", claims);

        assert_eq!(claims.len(), 1);
        assert_eq!(claims["who"], json!("u1"));
    }

    #[test]
    fn test_empty_list_is_identity() {
        let mut claims = Claims::new();
        claims.insert("a".to_string(), json!(1));
        let out = Extensions::new().run(&ClientId::generate(), "u1", claims.clone());
        assert_eq!(out, claims);
    }
}

//! Caller identity resolution.
//!
//! Every service call is scoped to an owner; the provider turns an opaque
//! token into that owner. The built-in [`StaticTokens`] provider covers
//! single-box deployments and tests; anything heavier implements the trait.

use std::collections::HashMap;

use crate::error::IdentityError;

/// The resolved caller. `user_id` is the owner key on documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerContext {
    pub user_id: String,
    pub display_name: Option<String>,
}

impl CallerContext {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}

pub trait IdentityProvider: Send + Sync {
    fn resolve(&self, token: &str) -> Result<CallerContext, IdentityError>;
}

/// Fixed token table. Unknown tokens are rejected; there is no anonymous
/// fallback.
pub struct StaticTokens {
    tokens: HashMap<String, CallerContext>,
}

impl StaticTokens {
    pub fn new() -> Self {
        Self {
            tokens: HashMap::new(),
        }
    }

    pub fn with_token(mut self, token: impl Into<String>, caller: CallerContext) -> Self {
        self.tokens.insert(token.into(), caller);
        self
    }
}

impl Default for StaticTokens {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityProvider for StaticTokens {
    fn resolve(&self, token: &str) -> Result<CallerContext, IdentityError> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or(IdentityError::Unauthorized)
    }
}

//! Caller resolution for the book API.
//!
//! The request token header is looked up once per request and turned into a [`Caller`].
//! Write handlers take [`RequireEditor`], which rejects callers without the edit
//! capability before the handler body runs.

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;
use std::collections::HashMap;

use crate::config::Auth;
use crate::error::ApiError;
use crate::handler::AppState;

#[derive(Debug, Clone, PartialEq)]
pub struct Caller {
    /// `None` for anonymous callers.
    pub name: Option<String>,
    pub can_edit: bool,
}

impl Caller {
    pub fn anonymous() -> Self {
        Caller {
            name: None,
            can_edit: false,
        }
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("anonymous")
    }
}

#[derive(Debug, Clone)]
struct Identity {
    name: String,
    can_edit: bool,
}

/// Maps request tokens to identities.
#[derive(Debug, Clone)]
pub struct Authenticator {
    header: String,
    identities: HashMap<String, Identity>,
}

impl Authenticator {
    pub fn new(auth: &Auth) -> Self {
        let identities = auth
            .users
            .iter()
            .filter(|user| !user.token.is_empty())
            .map(|user| {
                (
                    user.token.clone(),
                    Identity {
                        name: user.name.clone(),
                        can_edit: user.can_edit,
                    },
                )
            })
            .collect();

        Authenticator {
            header: auth.header.clone(),
            identities,
        }
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    /// Unknown or missing tokens resolve to an anonymous caller.
    pub fn resolve(&self, headers: &HeaderMap) -> Caller {
        let token = headers
            .get(self.header.as_str())
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|t| !t.is_empty());

        match token.and_then(|t| self.identities.get(t)) {
            Some(identity) => Caller {
                name: Some(identity.name.clone()),
                can_edit: identity.can_edit,
            },
            None => Caller::anonymous(),
        }
    }
}

/// A caller holding the edit capability. Rejects with 403 otherwise.
pub struct RequireEditor(pub Caller);

#[axum::async_trait]
impl FromRequestParts<AppState> for RequireEditor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let caller = state.auth.resolve(&parts.headers);
        if !caller.can_edit {
            tracing::info!(
                caller = caller.display_name(),
                method = %parts.method,
                path = %parts.uri.path(),
                "rejected write without edit capability"
            );
            return Err(ApiError::Forbidden);
        }
        Ok(RequireEditor(caller))
    }
}

//! Caller identity for planner operations.

use uuid::Uuid;

use crate::errors::{PlannerError, PlannerResult};

/// Opaque identifier of an authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserId(pub String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Context carried with every planner operation.
///
/// Services, the upload coordinator and the record adapter all receive it
/// explicitly, so ownership decisions never depend on ambient state.
#[derive(Debug, Clone)]
pub struct CallerContext {
    pub user_id: UserId,
    pub request_id: String,
}

impl CallerContext {
    /// Convenience constructor from a string.
    pub fn new<S: Into<String>>(user_id: S) -> Self {
        Self {
            user_id: UserId(user_id.into()),
            request_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn with_request_id<S: Into<String>>(mut self, request_id: S) -> Self {
        self.request_id = request_id.into();
        self
    }

    pub fn user_id(&self) -> &str {
        self.user_id.as_str()
    }

    /// A blank id is what a signed-out client ends up sending.
    pub fn is_authenticated(&self) -> bool {
        !self.user_id.0.trim().is_empty()
    }

    pub fn ensure_authenticated(&self) -> PlannerResult<()> {
        if self.is_authenticated() {
            Ok(())
        } else {
            Err(PlannerError::unauthorized("caller is not signed in"))
        }
    }

    /// True when `owner_id` names this caller.
    pub fn owns(&self, owner_id: &str) -> bool {
        self.is_authenticated() && self.user_id.0 == owner_id
    }
}

/// The auth service as seen by the planner: who is signed in right now.
pub trait SessionProvider: Send + Sync {
    fn current_caller(&self) -> Option<CallerContext>;
}

/// Resolve the signed-in caller or fail with `Unauthorized`.
pub fn require_caller(sessions: &dyn SessionProvider) -> PlannerResult<CallerContext> {
    let caller = sessions
        .current_caller()
        .ok_or_else(|| PlannerError::unauthorized("no active session"))?;
    caller.ensure_authenticated()?;
    Ok(caller)
}

/// Fixed session for tests and single-user tools.
#[derive(Debug, Clone, Default)]
pub struct StaticSession {
    caller: Option<CallerContext>,
}

impl StaticSession {
    pub fn signed_in<S: Into<String>>(user_id: S) -> Self {
        Self {
            caller: Some(CallerContext::new(user_id)),
        }
    }

    pub fn signed_out() -> Self {
        Self { caller: None }
    }
}

impl SessionProvider for StaticSession {
    fn current_caller(&self) -> Option<CallerContext> {
        self.caller.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    #[test]
    fn signed_out_session_is_unauthorized() {
        let err = require_caller(&StaticSession::signed_out()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthorized);
    }

    #[test]
    fn blank_user_id_is_unauthorized() {
        let err = require_caller(&StaticSession::signed_in("  ")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthorized);
    }

    #[test]
    fn owns_compares_user_ids() {
        let caller = CallerContext::new("alice");
        assert!(caller.owns("alice"));
        assert!(!caller.owns("bob"));
        assert!(!CallerContext::new("").owns(""));
    }
}

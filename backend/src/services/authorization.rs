//! Role-gated request authorization.
//!
//! The gate classifies every request as anonymous or authenticated, resolves the role of an
//! authenticated caller with exactly one directory read, and either lets the request through or
//! names the route to redirect to. It never errors: a failed or slow role lookup leaves the role
//! unresolved, which routes like an anonymous caller's home.

use std::{sync::Arc, time::Duration};

use crate::{
    models::user::UserRole, repositories::UserDirectory, services::identity::Identity,
    types::UserId,
};

pub const LOGIN_ROUTE: &str = "/";
pub const STUDENT_DASHBOARD: &str = "/student-dashboard";
pub const TEACHER_DASHBOARD: &str = "/teacher-dashboard";
pub const PUBLIC_ROUTES: [&str; 4] = ["/", "/register", "/reset-password", "/update-password"];

const TEACHER_PREFIX: &str = "/teacher";
const STUDENT_PREFIX: &str = "/student";

/// Who is making the request, as far as routing is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Caller {
    Anonymous,
    /// `role` is `None` when the profile is missing or could not be read in time.
    Authenticated {
        user_id: UserId,
        role: Option<UserRole>,
    },
}

impl Caller {
    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Caller::Anonymous => None,
            Caller::Authenticated { user_id, .. } => Some(*user_id),
        }
    }

    pub fn role(&self) -> Option<UserRole> {
        match self {
            Caller::Anonymous => None,
            Caller::Authenticated { role, .. } => *role,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    Redirect(&'static str),
}

#[derive(Clone)]
pub struct AuthorizationGate {
    directory: Arc<dyn UserDirectory>,
    lookup_timeout: Duration,
}

impl AuthorizationGate {
    pub fn new(directory: Arc<dyn UserDirectory>, lookup_timeout: Duration) -> Self {
        Self {
            directory,
            lookup_timeout,
        }
    }

    /// Resolves the caller's role with a single directory read.
    pub async fn resolve_caller(&self, identity: Option<Identity>) -> Caller {
        let Some(Identity { user_id }) = identity else {
            return Caller::Anonymous;
        };

        let role = match tokio::time::timeout(self.lookup_timeout, self.directory.get_role(user_id))
            .await
        {
            Ok(Ok(Some(role))) => Some(role),
            Ok(Ok(None)) => {
                tracing::warn!(user_id = %user_id, "No profile for authenticated user");
                None
            }
            Ok(Err(err)) => {
                tracing::warn!(user_id = %user_id, error = %err, "Role lookup failed");
                None
            }
            Err(_) => {
                tracing::warn!(
                    user_id = %user_id,
                    timeout_ms = self.lookup_timeout.as_millis() as u64,
                    "Role lookup timed out"
                );
                None
            }
        };

        Caller::Authenticated { user_id, role }
    }

    /// Routing policy. First matching rule wins.
    pub fn evaluate(path: &str, caller: &Caller) -> GateDecision {
        let role = match caller {
            Caller::Anonymous => {
                return if is_public(path) {
                    GateDecision::Allow
                } else {
                    GateDecision::Redirect(LOGIN_ROUTE)
                };
            }
            Caller::Authenticated { role, .. } => *role,
        };

        let home = home_dashboard(role);

        if path == LOGIN_ROUTE && home != LOGIN_ROUTE {
            return GateDecision::Redirect(home);
        }
        match role {
            Some(UserRole::Student) if path.starts_with(TEACHER_PREFIX) => {
                return GateDecision::Redirect(STUDENT_DASHBOARD);
            }
            Some(UserRole::Teacher) if path.starts_with(STUDENT_PREFIX) => {
                return GateDecision::Redirect(TEACHER_DASHBOARD);
            }
            _ => {}
        }
        if is_public(path) && home != LOGIN_ROUTE {
            return GateDecision::Redirect(home);
        }

        GateDecision::Allow
    }

    pub async fn authorize(&self, path: &str, identity: Option<Identity>) -> (Caller, GateDecision) {
        let caller = self.resolve_caller(identity).await;
        let decision = Self::evaluate(path, &caller);
        (caller, decision)
    }
}

pub fn home_dashboard(role: Option<UserRole>) -> &'static str {
    match role {
        Some(UserRole::Student) => STUDENT_DASHBOARD,
        Some(UserRole::Teacher) => TEACHER_DASHBOARD,
        None => LOGIN_ROUTE,
    }
}

fn is_public(path: &str) -> bool {
    PUBLIC_ROUTES.contains(&path)
}

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::{
    error::AppError,
    middleware::request_id::RequestId,
    models::user::UserRole,
    services::{Caller, GateDecision},
    state::AppState,
    types::UserId,
};

/// Paths the gate never sees: JSON API, static assets.
const UNGATED_PREFIXES: [&str; 3] = ["/api", "/assets", "/favicon.ico"];

/// Verifies the caller's identity, resolves their role and applies the routing policy.
///
/// Redirects are answered with 307 so a redirected POST is not silently turned into a GET.
/// Allowed requests carry the resolved [`Caller`] in their extensions.
pub async fn gate(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    if is_ungated(&path) {
        return next.run(request).await;
    }

    let identity = state.identity.verify(request.headers());
    let (caller, decision) = state.gate.authorize(&path, identity).await;

    match decision {
        GateDecision::Allow => {
            request.extensions_mut().insert(caller);
            next.run(request).await
        }
        GateDecision::Redirect(target) => {
            let request_id = request
                .extensions()
                .get::<RequestId>()
                .map(|id| id.0.as_str())
                .unwrap_or("-");
            tracing::debug!(
                path = %path,
                redirect_to = target,
                request_id = %request_id,
                user_id = ?caller.user_id(),
                role = ?caller.role(),
                "Gate redirect"
            );
            Redirect::temporary(target).into_response()
        }
    }
}

fn is_ungated(path: &str) -> bool {
    UNGATED_PREFIXES
        .iter()
        .any(|prefix| path.starts_with(prefix))
}

/// The caller's id when their role is resolved as `expected`.
pub fn require_role(caller: &Caller, expected: UserRole) -> Result<UserId, AppError> {
    match caller {
        Caller::Authenticated {
            user_id,
            role: Some(role),
        } if *role == expected => Ok(*user_id),
        Caller::Anonymous => Err(AppError::Unauthorized("Sign in required".into())),
        _ => Err(AppError::Forbidden(format!(
            "This page is only available to {}s",
            expected.as_str()
        ))),
    }
}

pub fn require_teacher(caller: &Caller) -> Result<UserId, AppError> {
    require_role(caller, UserRole::Teacher)
}

pub fn require_student(caller: &Caller) -> Result<UserId, AppError> {
    require_role(caller, UserRole::Student)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_and_assets_bypass_the_gate() {
        assert!(is_ungated("/api/health"));
        assert!(is_ungated("/api-doc/openapi.json"));
        assert!(is_ungated("/assets/app.js"));
        assert!(is_ungated("/favicon.ico"));
        assert!(!is_ungated("/"));
        assert!(!is_ungated("/teacher/courses/C1"));
    }

    #[test]
    fn require_role_checks_resolved_role() {
        let user_id = UserId::new();
        let teacher = Caller::Authenticated {
            user_id,
            role: Some(UserRole::Teacher),
        };
        assert_eq!(require_teacher(&teacher).unwrap(), user_id);
        assert!(matches!(
            require_student(&teacher),
            Err(AppError::Forbidden(_))
        ));

        let unresolved = Caller::Authenticated {
            user_id,
            role: None,
        };
        assert!(matches!(
            require_teacher(&unresolved),
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            require_student(&Caller::Anonymous),
            Err(AppError::Unauthorized(_))
        ));
    }
}

use axum::{
    Json,
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::AppState;

/// Caller identity decoded from the bearer token, attached as a request
/// extension by `require_auth`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub name: String,
}

fn parse_authorization_bearer(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    let (prefix, rest) = trimmed.split_once(' ')?;
    if !prefix.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = rest.trim();
    if token.is_empty() {
        return None;
    }
    Some(token)
}

fn unauthorized(reason: &'static str, req: &Request) -> Response {
    tracing::warn!(
        path = %req.uri().path(),
        method = %req.method(),
        reason,
        "Unauthorized API request"
    );
    let response = ApiResponse::<()>::error("Unauthorized");
    (StatusCode::UNAUTHORIZED, Json(response)).into_response()
}

pub async fn require_auth(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let Some(token) = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_authorization_bearer)
    else {
        return unauthorized("missing_token", &req);
    };

    let claims = match state.signer().verify(token) {
        Ok(claims) => claims,
        Err(utils_jwt::JwtError::Expired) => return unauthorized("token_expired", &req),
        Err(_) => return unauthorized("token_invalid", &req),
    };

    let mut req = req;
    req.extensions_mut().insert(AuthUser {
        id: claims.sub,
        name: claims.name,
    });
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::parse_authorization_bearer;

    #[test]
    fn bearer_parsing_accepts_any_case_and_trims() {
        assert_eq!(parse_authorization_bearer("Bearer abc"), Some("abc"));
        assert_eq!(parse_authorization_bearer("bearer  abc "), Some("abc"));
        assert_eq!(parse_authorization_bearer("BEARER abc"), Some("abc"));
    }

    #[test]
    fn bearer_parsing_rejects_other_schemes_and_empty_tokens() {
        assert_eq!(parse_authorization_bearer("Basic abc"), None);
        assert_eq!(parse_authorization_bearer("Bearer "), None);
        assert_eq!(parse_authorization_bearer("abc"), None);
    }
}

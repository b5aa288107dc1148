use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::Json,
};
use uuid::Uuid;

use expatlink_common::ApiResponse;

use crate::AppState;

/// Authenticated caller identity, resolved from the `Authorization: Bearer`
/// header before any core operation runs.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Uuid);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = (StatusCode, Json<ApiResponse<()>>);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(parts).ok_or_else(unauthorized)?;

        let user_id = state
            .jwt_service
            .extract_user_id(&token)
            .map_err(|_| unauthorized())?;

        Ok(AuthUser(user_id))
    }
}

fn extract_bearer_token(parts: &Parts) -> Option<String> {
    let auth_header = parts.headers.get("Authorization")?;
    let auth_str = auth_header.to_str().ok()?;

    auth_str
        .strip_prefix("Bearer ")
        .map(|token| token.to_string())
}

fn unauthorized() -> (StatusCode, Json<ApiResponse<()>>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(ApiResponse::error("Authentication required".to_string())),
    )
}

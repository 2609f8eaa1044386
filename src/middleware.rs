use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

use crate::{app_error::AppError, app_state::AppState, status::Role};

/// Claims minted by the session provider.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Claims {
    pub sub: i32,
    pub role: Role,
    pub exp: usize,
}

/// Caller identity attached to every authenticated request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub user_id: i32,
    pub role: Role,
}

impl Session {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

pub fn decode_session(token: &str, key: &DecodingKey) -> Result<Session, AppError> {
    let data = decode::<Claims>(token, key, &Validation::new(Algorithm::HS256)).map_err(|err| {
        tracing::debug!("Rejected session token: {err}");
        AppError::Authentication("Invalid or expired session".into())
    })?;

    Ok(Session {
        user_id: data.claims.sub,
        role: data.claims.role,
    })
}

/// Requires a valid bearer session and exposes it as `Extension<Session>`.
pub async fn session_authorization(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Authentication("Missing bearer session token".into()))?;

    let session = decode_session(token, &state.session_key)?;
    request.extensions_mut().insert(session);

    Ok(next.run(request).await)
}

#[cfg(test)]
pub mod testing {
    use jsonwebtoken::{EncodingKey, Header, encode};

    use super::*;

    pub fn issue_token(secret: &str, user_id: i32, role: Role) -> String {
        let exp = (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp() as usize;
        encode(
            &Header::default(),
            &Claims {
                sub: user_id,
                role,
                exp,
            },
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }
}

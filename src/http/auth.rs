use axum::{extract::State, http::StatusCode, Json};
use jsonwebtoken::{encode, Header};
use serde::Deserialize;
use time::OffsetDateTime;

use crate::{api, tracker};

use super::{AuthClaims, AuthError, SharedAppState};

#[derive(Deserialize)]
pub(super) struct AuthInput {
    email: String,
    password: String,
}

pub(super) async fn auth(
    State(state): State<SharedAppState>,
    Json(AuthInput { email, password }): Json<AuthInput>,
) -> Result<String, AuthError> {
    use AuthError as E;

    let user = state
        .tracker
        .authenticate(&email, &password)
        .await?
        .ok_or(E::WrongEmailOrPassword)?;

    let expires_at = OffsetDateTime::now_utc() + state.jwt_expiration_time;
    encode(
        &Header::default(),
        &AuthClaims {
            user_id: user.id,
            exp: expires_at.unix_timestamp(),
        },
        &state.jwt_encoding_key,
    )
    .map_err(|_| E::InvalidToken)
}

pub(super) async fn register(
    State(state): State<SharedAppState>,
    Json(registration): Json<tracker::Registration>,
) -> Result<(StatusCode, Json<api::User>), tracker::Error> {
    let user = state.tracker.register(registration).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

pub(super) async fn get_user(
    State(state): State<SharedAppState>,
    auth_claims: AuthClaims,
) -> Result<Json<api::User>, tracker::Error> {
    let my = state.tracker.user(auth_claims.user_id).await?;
    Ok(Json(my.into()))
}

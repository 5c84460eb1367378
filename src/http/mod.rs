//! REST surface over a [`Tracker`].

mod agents;
mod auth;
mod tickets;

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{request, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, RequestPartsExt as _, Router,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use derive_more::From;
use jsonwebtoken::{decode, DecodingKey, EncodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;

use crate::{
    api,
    db::Store,
    tracker::{self, Tracker},
    Config,
};

pub type SharedAppState = Arc<AppState>;

pub struct AppState {
    tracker: Tracker,

    jwt_expiration_time: Duration,

    jwt_decoding_key: DecodingKey,

    jwt_encoding_key: EncodingKey,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: &Config) -> SharedAppState {
        Arc::new(Self {
            tracker: Tracker::new(store, config.sla, config.agents),
            jwt_expiration_time: config.jwt.expiration_time,
            jwt_decoding_key: DecodingKey::from_secret(
                config.jwt.secret.as_bytes(),
            ),
            jwt_encoding_key: EncodingKey::from_secret(
                config.jwt.secret.as_bytes(),
            ),
        })
    }
}

pub fn router(state: SharedAppState) -> Router {
    Router::new()
        .route("/auth", post(auth::auth))
        .route("/register", post(auth::register))
        .route("/user", get(auth::get_user))
        .route(
            "/tickets",
            get(tickets::list_tickets).post(tickets::create_ticket),
        )
        .route("/tickets/agent/my-tickets", get(tickets::my_tickets))
        .route("/tickets/agent/unassigned", get(tickets::unassigned_tickets))
        .route("/tickets/admin/tickets", get(tickets::admin_tickets))
        .route(
            "/tickets/admin/agents-workload",
            get(tickets::agents_workload),
        )
        .route(
            "/tickets/admin/assign/:id/:agent_id",
            post(tickets::admin_assign),
        )
        .route("/tickets/admin/auto-assign/:id", post(tickets::auto_assign))
        .route("/tickets/admin/bulk-update", post(tickets::bulk_update))
        .route("/tickets/stats/dashboard", get(tickets::dashboard))
        .route("/tickets/stats/aging", get(tickets::aging))
        .route(
            "/tickets/:id",
            get(tickets::get_ticket)
                .put(tickets::update_ticket)
                .delete(tickets::delete_ticket),
        )
        .route("/tickets/:id/assign", post(tickets::assign))
        .route("/tickets/:id/pickup", post(tickets::pickup))
        .route("/tickets/:id/status", post(tickets::set_status))
        .route("/tickets/:id/escalate", post(tickets::escalate))
        .route("/tickets/:id/comment", post(tickets::comment))
        .route("/tickets/:id/feedback", post(tickets::feedback))
        .route(
            "/agents/:id",
            get(agents::get_agent).patch(agents::edit_agent),
        )
        .with_state(state)
}

impl IntoResponse for tracker::Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) | Self::CapacityExceeded { .. } => {
                StatusCode::CONFLICT
            }
            Self::Unauthorized => StatusCode::FORBIDDEN,
            Self::Db(e) => {
                error!("store failure: {e}");
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        };
        (status, Json(json!({ "message": self.to_string() }))).into_response()
    }
}

#[derive(Debug, From)]
pub enum AuthError {
    #[from]
    Tracker(tracker::Error),
    InvalidToken,
    WrongEmailOrPassword,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            Self::Tracker(e) => e.into_response(),
            Self::InvalidToken => StatusCode::UNAUTHORIZED.into_response(),
            Self::WrongEmailOrPassword => StatusCode::FORBIDDEN.into_response(),
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct AuthClaims {
    user_id: api::user::Id,
    exp: i64,
}

#[async_trait]
impl FromRequestParts<SharedAppState> for AuthClaims {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut request::Parts,
        state: &SharedAppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| AuthError::InvalidToken)?;
        let token_data = decode::<Self>(
            bearer.token(),
            &state.jwt_decoding_key,
            &Validation::default(),
        )
        .map_err(|_| AuthError::InvalidToken)?;

        Ok(token_data.claims)
    }
}

/// The authenticated user resolved to an [`tracker::Actor`].
pub struct Actor(pub tracker::Actor);

#[async_trait]
impl FromRequestParts<SharedAppState> for Actor {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut request::Parts,
        state: &SharedAppState,
    ) -> Result<Self, Self::Rejection> {
        let claims = AuthClaims::from_request_parts(parts, state).await?;
        let actor = state.tracker.actor(claims.user_id).await.map_err(
            |e| match e {
                tracker::Error::NotFound(_) => AuthError::InvalidToken,
                e => AuthError::Tracker(e),
            },
        )?;
        Ok(Self(actor))
    }
}

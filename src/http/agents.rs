use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    api::{self, agent::Edit},
    tracker::Error,
};

use super::{Actor, SharedAppState};

pub(super) async fn get_agent(
    State(state): State<SharedAppState>,
    Actor(my): Actor,
    Path(id): Path<api::agent::Id>,
) -> Result<Json<api::Agent>, Error> {
    Ok(Json(state.tracker.agent(&my, id).await?))
}

pub(super) async fn edit_agent(
    State(state): State<SharedAppState>,
    Actor(my): Actor,
    Path(id): Path<api::agent::Id>,
    Json(edit): Json<Edit>,
) -> Result<Json<api::Agent>, Error> {
    Ok(Json(state.tracker.edit_agent(&my, id, edit).await?))
}

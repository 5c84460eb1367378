use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use time::OffsetDateTime;

use crate::{
    api::{
        self,
        agent::{self, WorkloadList},
        report::{Aging, Stats},
        ticket::{AutoAssigned, Draft, Id, List, Patch, Priority, Status},
    },
    db::ticket::Filter,
    tracker::{lifecycle::Bulk, Error},
};

use super::{Actor, SharedAppState};

pub(super) async fn list_tickets(
    State(state): State<SharedAppState>,
    Actor(my): Actor,
) -> Result<Json<List>, Error> {
    Ok(Json(state.tracker.list_for(&my).await?.into()))
}

pub(super) async fn create_ticket(
    State(state): State<SharedAppState>,
    Actor(my): Actor,
    Json(draft): Json<Draft>,
) -> Result<(StatusCode, Json<api::Ticket>), Error> {
    let ticket = state.tracker.create(&my, draft).await?;
    Ok((StatusCode::CREATED, Json(ticket.into())))
}

pub(super) async fn my_tickets(
    State(state): State<SharedAppState>,
    Actor(my): Actor,
) -> Result<Json<List>, Error> {
    Ok(Json(state.tracker.list_mine(&my).await?.into()))
}

pub(super) async fn unassigned_tickets(
    State(state): State<SharedAppState>,
    Actor(my): Actor,
) -> Result<Json<List>, Error> {
    Ok(Json(state.tracker.list_unassigned(&my).await?.into()))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct AdminTicketsQuery {
    status: Option<Status>,
    priority: Option<Priority>,
    assigned_to: Option<agent::Id>,
    #[serde(default)]
    unassigned: bool,
    escalated: Option<bool>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    created_from: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    created_to: Option<OffsetDateTime>,
    search: Option<String>,
}

pub(super) async fn admin_tickets(
    State(state): State<SharedAppState>,
    Actor(my): Actor,
    Query(query): Query<AdminTicketsQuery>,
) -> Result<Json<List>, Error> {
    let filter = Filter {
        customer: None,
        assigned_to: query.assigned_to,
        unassigned: query.unassigned,
        status: query.status,
        priority: query.priority,
        escalated: query.escalated,
        created_from: query.created_from,
        created_to: query.created_to,
        search: query.search.filter(|s| !s.trim().is_empty()),
    };
    Ok(Json(state.tracker.list_admin(&my, &filter).await?.into()))
}

pub(super) async fn agents_workload(
    State(state): State<SharedAppState>,
    Actor(my): Actor,
) -> Result<Json<WorkloadList>, Error> {
    Ok(Json(state.tracker.workloads(&my).await?))
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct AdminAssignInput {
    #[serde(default)]
    override_capacity: bool,
}

pub(super) async fn admin_assign(
    State(state): State<SharedAppState>,
    Actor(my): Actor,
    Path((id, agent_id)): Path<(Id, agent::Id)>,
    input: Option<Json<AdminAssignInput>>,
) -> Result<Json<api::Ticket>, Error> {
    my.require_admin()?;
    let AdminAssignInput { override_capacity } =
        input.map(|Json(i)| i).unwrap_or_default();
    let ticket = state
        .tracker
        .assign(&my, id, Some(agent_id), override_capacity)
        .await?;
    Ok(Json(ticket.into()))
}

pub(super) async fn auto_assign(
    State(state): State<SharedAppState>,
    Actor(my): Actor,
    Path(id): Path<Id>,
) -> Result<Json<AutoAssigned>, Error> {
    let (ticket, recommendation) = state.tracker.auto_assign(&my, id).await?;
    Ok(Json(AutoAssigned {
        ticket: ticket.into(),
        recommendation,
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct BulkUpdateInput {
    ticket_ids: Vec<Id>,
    status: Option<Status>,
    priority: Option<Priority>,
    notes: Option<String>,
}

pub(super) async fn bulk_update(
    State(state): State<SharedAppState>,
    Actor(my): Actor,
    Json(BulkUpdateInput {
        ticket_ids,
        status,
        priority,
        notes,
    }): Json<BulkUpdateInput>,
) -> Result<Json<List>, Error> {
    let bulk = Bulk {
        status,
        priority,
        note: notes,
    };
    let tickets = state.tracker.bulk_update(&my, &ticket_ids, bulk).await?;
    Ok(Json(tickets.into()))
}

pub(super) async fn dashboard(
    State(state): State<SharedAppState>,
    Actor(my): Actor,
) -> Result<Json<Stats>, Error> {
    Ok(Json(state.tracker.stats(&my).await?))
}

pub(super) async fn aging(
    State(state): State<SharedAppState>,
    Actor(my): Actor,
) -> Result<Json<Aging>, Error> {
    Ok(Json(state.tracker.aging(&my).await?))
}

pub(super) async fn get_ticket(
    State(state): State<SharedAppState>,
    Actor(my): Actor,
    Path(id): Path<Id>,
) -> Result<Json<api::Ticket>, Error> {
    Ok(Json(state.tracker.get(&my, id).await?.into()))
}

pub(super) async fn update_ticket(
    State(state): State<SharedAppState>,
    Actor(my): Actor,
    Path(id): Path<Id>,
    Json(patch): Json<Patch>,
) -> Result<Json<api::Ticket>, Error> {
    Ok(Json(state.tracker.update(&my, id, patch).await?.into()))
}

pub(super) async fn delete_ticket(
    State(state): State<SharedAppState>,
    Actor(my): Actor,
    Path(id): Path<Id>,
) -> Result<StatusCode, Error> {
    state.tracker.delete(&my, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct AssignInput {
    #[serde(default)]
    agent_id: Option<agent::Id>,
}

pub(super) async fn assign(
    State(state): State<SharedAppState>,
    Actor(my): Actor,
    Path(id): Path<Id>,
    input: Option<Json<AssignInput>>,
) -> Result<Json<api::Ticket>, Error> {
    let AssignInput { agent_id } = input.map(|Json(i)| i).unwrap_or_default();
    let ticket = state.tracker.assign(&my, id, agent_id, false).await?;
    Ok(Json(ticket.into()))
}

pub(super) async fn pickup(
    State(state): State<SharedAppState>,
    Actor(my): Actor,
    Path(id): Path<Id>,
) -> Result<Json<api::Ticket>, Error> {
    Ok(Json(state.tracker.self_assign(&my, id).await?.into()))
}

#[derive(Deserialize)]
pub(super) struct StatusInput {
    status: Status,
}

pub(super) async fn set_status(
    State(state): State<SharedAppState>,
    Actor(my): Actor,
    Path(id): Path<Id>,
    Json(StatusInput { status }): Json<StatusInput>,
) -> Result<Json<api::Ticket>, Error> {
    Ok(Json(state.tracker.set_status(&my, id, status).await?.into()))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct EscalateInput {
    #[serde(default, alias = "escalation_reason")]
    escalation_reason: String,
}

pub(super) async fn escalate(
    State(state): State<SharedAppState>,
    Actor(my): Actor,
    Path(id): Path<Id>,
    Json(EscalateInput { escalation_reason }): Json<EscalateInput>,
) -> Result<Json<api::Ticket>, Error> {
    let ticket = state.tracker.escalate(&my, id, &escalation_reason).await?;
    Ok(Json(ticket.into()))
}

#[derive(Deserialize)]
pub(super) struct CommentInput {
    #[serde(default)]
    comment: String,
}

pub(super) async fn comment(
    State(state): State<SharedAppState>,
    Actor(my): Actor,
    Path(id): Path<Id>,
    Json(CommentInput { comment }): Json<CommentInput>,
) -> Result<Json<api::Ticket>, Error> {
    Ok(Json(state.tracker.add_comment(&my, id, &comment).await?.into()))
}

#[derive(Deserialize)]
pub(super) struct FeedbackInput {
    rating: u8,
}

pub(super) async fn feedback(
    State(state): State<SharedAppState>,
    Actor(my): Actor,
    Path(id): Path<Id>,
    Json(FeedbackInput { rating }): Json<FeedbackInput>,
) -> Result<Json<api::Ticket>, Error> {
    let ticket = state.tracker.submit_feedback(&my, id, rating).await?;
    Ok(Json(ticket.into()))
}

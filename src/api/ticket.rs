use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::db::{self, agent, customer};

pub use crate::db::ticket::{
    Complexity, HistoryEntry, Id, Kind, Note, Priority, Severity, Status,
};

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: Id,
    pub subject: String,
    pub description: String,
    pub category: Option<String>,
    pub domain: Option<String>,
    pub product: Option<String>,
    pub operation_type: Option<String>,
    pub priority: Priority,
    pub complexity: Complexity,
    pub severity: Severity,
    #[serde(rename = "type")]
    pub kind: Kind,
    pub region: Option<String>,
    pub country: Option<String>,
    pub account: Option<String>,
    pub skills_required: Vec<String>,
    pub tags: Vec<String>,
    pub security_restriction: bool,
    pub status: Status,
    pub customer: customer::Id,
    pub assigned_to: Option<agent::Id>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub sla_deadline: OffsetDateTime,
    pub escalated: bool,
    pub escalation_reason: Option<String>,
    pub feedback_rating: Option<u8>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub feedback_date: Option<OffsetDateTime>,
    pub internal_notes: Vec<Note>,
    pub history: Vec<HistoryEntry>,
}

impl From<db::Ticket> for Ticket {
    fn from(ticket: db::Ticket) -> Self {
        Self {
            id: ticket.id,
            subject: ticket.subject,
            description: ticket.description,
            category: ticket.category,
            domain: ticket.domain,
            product: ticket.product,
            operation_type: ticket.operation_type,
            priority: ticket.priority,
            complexity: ticket.complexity,
            severity: ticket.severity,
            kind: ticket.kind,
            region: ticket.region,
            country: ticket.country,
            account: ticket.account,
            skills_required: ticket.skills_required,
            tags: ticket.tags,
            security_restriction: ticket.security_restriction,
            status: ticket.status,
            customer: ticket.customer,
            assigned_to: ticket.assigned_to,
            created_at: ticket.created_at,
            updated_at: ticket.updated_at,
            sla_deadline: ticket.sla_deadline,
            escalated: ticket.escalated,
            escalation_reason: ticket.escalation_reason,
            feedback_rating: ticket.feedback_rating,
            feedback_date: ticket.feedback_date,
            internal_notes: ticket.internal_notes,
            history: ticket.history,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct List {
    pub tickets: Vec<Ticket>,
    pub total_count: usize,
}

impl From<Vec<db::Ticket>> for List {
    fn from(tickets: Vec<db::Ticket>) -> Self {
        Self {
            total_count: tickets.len(),
            tickets: tickets.into_iter().map(Ticket::from).collect(),
        }
    }
}

/// A ticket as reported by a customer. Unset classification falls back to
/// the defaults of each field.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Draft {
    pub subject: String,
    pub description: String,
    pub category: Option<String>,
    pub domain: Option<String>,
    pub product: Option<String>,
    pub operation_type: Option<String>,
    pub priority: Option<Priority>,
    pub complexity: Option<Complexity>,
    pub severity: Option<Severity>,
    #[serde(rename = "type")]
    pub kind: Option<Kind>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub account: Option<String>,
    pub skills_required: Vec<String>,
    pub tags: Vec<String>,
    pub security_restriction: bool,
}

/// Partial update of a ticket. Only set fields are applied.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Patch {
    pub subject: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub domain: Option<String>,
    pub product: Option<String>,
    pub operation_type: Option<String>,
    pub priority: Option<Priority>,
    pub complexity: Option<Complexity>,
    pub severity: Option<Severity>,
    #[serde(rename = "type")]
    pub kind: Option<Kind>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub account: Option<String>,
    pub skills_required: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
    pub security_restriction: Option<bool>,
    pub status: Option<Status>,
}

/// A ticket bound by automatic assignment, with how its agent scored.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoAssigned {
    pub ticket: Ticket,
    pub recommendation: super::agent::Recommendation,
}

use enum_utils::TryFromRepr;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio_postgres::{types::Json, Row};

use super::{agent, customer, Client, Error};

#[derive(Clone, Debug)]
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
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub sla_deadline: OffsetDateTime,
    pub escalated: bool,
    pub escalation_reason: Option<String>,
    pub feedback_rating: Option<u8>,
    pub feedback_date: Option<OffsetDateTime>,
    pub internal_notes: Vec<Note>,
    pub history: Vec<HistoryEntry>,
}

impl Ticket {
    /// The only place a ticket's status is changed.
    ///
    /// Appends exactly one history entry when `status` differs from the
    /// current one and returns the previous status; otherwise leaves the
    /// ticket untouched.
    pub fn set_status(
        &mut self,
        status: Status,
        changed_by: &str,
        now: OffsetDateTime,
    ) -> Option<Status> {
        if self.status == status {
            return None;
        }
        let previous = std::mem::replace(&mut self.status, status);
        self.history.push(HistoryEntry {
            status,
            changed_at: now,
            changed_by: changed_by.to_owned(),
        });
        self.updated_at = now;
        Some(previous)
    }

    pub fn add_note(&mut self, body: &str, added_by: &str, now: OffsetDateTime) {
        self.internal_notes.push(Note {
            body: body.to_owned(),
            added_by: added_by.to_owned(),
            created_at: now,
        });
        self.updated_at = now;
    }
}

impl TryFrom<&Row> for Ticket {
    type Error = Error;

    fn try_from(row: &Row) -> Result<Self, Self::Error> {
        let feedback_rating = row
            .try_get::<_, Option<i16>>("feedback_rating")?
            .map(u8::try_from)
            .transpose()
            .map_err(|_| Error::Corrupted("feedback_rating"))?;
        Ok(Self {
            id: row.try_get("id")?,
            subject: row.try_get("subject")?,
            description: row.try_get("description")?,
            category: row.try_get("category")?,
            domain: row.try_get("domain")?,
            product: row.try_get("product")?,
            operation_type: row.try_get("operation_type")?,
            priority: row.try_get("priority")?,
            complexity: row.try_get("complexity")?,
            severity: row.try_get("severity")?,
            kind: row.try_get("kind")?,
            region: row.try_get("region")?,
            country: row.try_get("country")?,
            account: row.try_get("account")?,
            skills_required: row.try_get("skills_required")?,
            tags: row.try_get("tags")?,
            security_restriction: row.try_get("security_restriction")?,
            status: row.try_get("status")?,
            customer: row.try_get("customer_id")?,
            assigned_to: row.try_get("assigned_to")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            sla_deadline: row.try_get("sla_deadline")?,
            escalated: row.try_get("escalated")?,
            escalation_reason: row.try_get("escalation_reason")?,
            feedback_rating,
            feedback_date: row.try_get("feedback_date")?,
            internal_notes: row
                .try_get::<_, Json<Vec<Note>>>("internal_notes")?
                .0,
            history: row.try_get::<_, Json<Vec<HistoryEntry>>>("history")?.0,
        })
    }
}

pub(super) fn history_json(ticket: &Ticket) -> Json<&Vec<HistoryEntry>> {
    Json(&ticket.history)
}

uuid_id!(Id);

#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
    TryFromRepr,
)]
#[repr(u8)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Reported by a customer, nobody has picked it up yet.
    New = 1,

    /// Bound to an agent.
    Assigned = 2,

    InProgress = 3,

    /// Blocked on an answer from the customer.
    WaitingCustomer = 4,

    Resolved = 5,

    Closed = 6,
}

int2_enum!(Status, "status");

impl Status {
    /// Whether a ticket in this status still counts towards its agent's
    /// workload.
    pub fn is_open(self) -> bool {
        !matches!(self, Self::Resolved | Self::Closed)
    }
}

#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
    TryFromRepr,
)]
#[repr(u8)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low = 1,
    #[default]
    Medium = 2,
    High = 3,
    Critical = 4,
}

int2_enum!(Priority, "priority");

impl Priority {
    /// Urgent tickets get the short SLA window.
    pub fn is_urgent(self) -> bool {
        matches!(self, Self::High | Self::Critical)
    }
}

#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Eq,
    PartialEq,
    Serialize,
    TryFromRepr,
)]
#[repr(u8)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Simple = 1,
    #[default]
    Moderate = 2,
    Complex = 3,
}

int2_enum!(Complexity, "complexity");

#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Eq,
    PartialEq,
    Serialize,
    TryFromRepr,
)]
#[repr(u8)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[default]
    Minor = 1,
    Major = 2,
    Critical = 3,
    Blocker = 4,
}

int2_enum!(Severity, "severity");

#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Eq,
    PartialEq,
    Serialize,
    TryFromRepr,
)]
#[repr(u8)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    #[default]
    Incident = 1,
    Request = 2,
    Problem = 3,
    Change = 4,
}

int2_enum!(Kind, "ticket type");

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub status: Status,
    #[serde(with = "time::serde::rfc3339")]
    pub changed_at: OffsetDateTime,
    pub changed_by: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub body: String,
    pub added_by: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Conditions a listed ticket has to meet. Unset fields don't restrict.
#[derive(Clone, Debug, Default)]
pub struct Filter {
    pub customer: Option<customer::Id>,
    pub assigned_to: Option<agent::Id>,
    pub unassigned: bool,
    pub status: Option<Status>,
    pub priority: Option<Priority>,
    pub escalated: Option<bool>,
    pub created_from: Option<OffsetDateTime>,
    pub created_to: Option<OffsetDateTime>,

    /// Case-insensitive substring of the subject or the description.
    pub search: Option<String>,
}

impl Filter {
    pub fn matches(&self, ticket: &Ticket) -> bool {
        let search = self.search.as_deref().map(str::to_lowercase);
        self.customer.map_or(true, |id| ticket.customer == id)
            && self
                .assigned_to
                .map_or(true, |id| ticket.assigned_to == Some(id))
            && (!self.unassigned || ticket.assigned_to.is_none())
            && self.status.map_or(true, |s| ticket.status == s)
            && self.priority.map_or(true, |p| ticket.priority == p)
            && self.escalated.map_or(true, |e| ticket.escalated == e)
            && self.created_from.map_or(true, |t| ticket.created_at >= t)
            && self.created_to.map_or(true, |t| ticket.created_at <= t)
            && search.map_or(true, |needle| {
                ticket.subject.to_lowercase().contains(&needle)
                    || ticket.description.to_lowercase().contains(&needle)
            })
    }
}

/// Escapes `LIKE` wildcards so the search term matches literally.
fn like_pattern(search: &str) -> String {
    let escaped = search
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

impl Client {
    pub async fn get_ticket_by_id(
        &self,
        id: Id,
    ) -> Result<Option<Ticket>, Error> {
        const SQL: &str = "\
            SELECT id, subject, description, category, domain, product, \
                   operation_type, priority, complexity, severity, kind, \
                   region, country, account, skills_required, tags, \
                   security_restriction, status, customer_id, assigned_to, \
                   created_at, updated_at, sla_deadline, escalated, \
                   escalation_reason, feedback_rating, feedback_date, \
                   internal_notes, history \
            FROM tickets \
            WHERE id = $1";
        self.0
            .query_opt(SQL, &[&id])
            .await?
            .as_ref()
            .map(Ticket::try_from)
            .transpose()
    }

    pub async fn write_ticket(&self, ticket: &Ticket) -> Result<(), Error> {
        const SQL: &str = "\
            INSERT INTO tickets (id, subject, description, category, domain, \
                                 product, operation_type, priority, \
                                 complexity, severity, kind, region, \
                                 country, account, skills_required, tags, \
                                 security_restriction, status, customer_id, \
                                 assigned_to, created_at, updated_at, \
                                 sla_deadline, escalated, escalation_reason, \
                                 feedback_rating, feedback_date, \
                                 internal_notes, history) \
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, \
                    $14, $15, $16, $17, $18, $19, $20, $21, $22, $23, $24, \
                    $25, $26, $27, $28, $29) \
            ON CONFLICT (id) DO UPDATE \
            SET subject = EXCLUDED.subject, \
                description = EXCLUDED.description, \
                category = EXCLUDED.category, \
                domain = EXCLUDED.domain, \
                product = EXCLUDED.product, \
                operation_type = EXCLUDED.operation_type, \
                priority = EXCLUDED.priority, \
                complexity = EXCLUDED.complexity, \
                severity = EXCLUDED.severity, \
                kind = EXCLUDED.kind, \
                region = EXCLUDED.region, \
                country = EXCLUDED.country, \
                account = EXCLUDED.account, \
                skills_required = EXCLUDED.skills_required, \
                tags = EXCLUDED.tags, \
                security_restriction = EXCLUDED.security_restriction, \
                status = EXCLUDED.status, \
                assigned_to = EXCLUDED.assigned_to, \
                updated_at = EXCLUDED.updated_at, \
                sla_deadline = EXCLUDED.sla_deadline, \
                escalated = EXCLUDED.escalated, \
                escalation_reason = EXCLUDED.escalation_reason, \
                feedback_rating = EXCLUDED.feedback_rating, \
                feedback_date = EXCLUDED.feedback_date, \
                internal_notes = EXCLUDED.internal_notes, \
                history = EXCLUDED.history";

        self.0
            .execute(
                SQL,
                &[
                    &ticket.id,
                    &ticket.subject,
                    &ticket.description,
                    &ticket.category,
                    &ticket.domain,
                    &ticket.product,
                    &ticket.operation_type,
                    &ticket.priority,
                    &ticket.complexity,
                    &ticket.severity,
                    &ticket.kind,
                    &ticket.region,
                    &ticket.country,
                    &ticket.account,
                    &ticket.skills_required,
                    &ticket.tags,
                    &ticket.security_restriction,
                    &ticket.status,
                    &ticket.customer,
                    &ticket.assigned_to,
                    &ticket.created_at,
                    &ticket.updated_at,
                    &ticket.sla_deadline,
                    &ticket.escalated,
                    &ticket.escalation_reason,
                    &ticket.feedback_rating.map(i16::from),
                    &ticket.feedback_date,
                    &Json(&ticket.internal_notes),
                    &history_json(ticket),
                ],
            )
            .await?;
        Ok(())
    }

    pub async fn delete_ticket(&self, id: Id) -> Result<bool, Error> {
        const SQL: &str = "DELETE FROM tickets WHERE id = $1";
        Ok(self.0.execute(SQL, &[&id]).await? == 1)
    }

    pub async fn list_tickets(
        &self,
        filter: &Filter,
    ) -> Result<Vec<Ticket>, Error> {
        const SQL: &str = "\
            SELECT id, subject, description, category, domain, product, \
                   operation_type, priority, complexity, severity, kind, \
                   region, country, account, skills_required, tags, \
                   security_restriction, status, customer_id, assigned_to, \
                   created_at, updated_at, sla_deadline, escalated, \
                   escalation_reason, feedback_rating, feedback_date, \
                   internal_notes, history \
            FROM tickets \
            WHERE ($1::UUID IS NULL OR customer_id = $1) \
              AND ($2::UUID IS NULL OR assigned_to = $2) \
              AND (NOT $3 OR assigned_to IS NULL) \
              AND ($4::INT2 IS NULL OR status = $4) \
              AND ($5::INT2 IS NULL OR priority = $5) \
              AND ($6::BOOL IS NULL OR escalated = $6) \
              AND ($7::TIMESTAMPTZ IS NULL OR created_at >= $7) \
              AND ($8::TIMESTAMPTZ IS NULL OR created_at <= $8) \
              AND ($9::TEXT IS NULL \
                   OR subject ILIKE $9 \
                   OR description ILIKE $9) \
            ORDER BY created_at DESC, \
                     id DESC";

        let search = filter.search.as_deref().map(like_pattern);
        self.0
            .query(
                SQL,
                &[
                    &filter.customer,
                    &filter.assigned_to,
                    &filter.unassigned,
                    &filter.status,
                    &filter.priority,
                    &filter.escalated,
                    &filter.created_from,
                    &filter.created_to,
                    &search,
                ],
            )
            .await?
            .iter()
            .map(Ticket::try_from)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_like_wildcards() {
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern("printer"), "%printer%");
    }
}

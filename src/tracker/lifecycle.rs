//! Status changes, escalation, internal notes and feedback.
//!
//! Any status can be set from any other one. What a status change implies
//! for the assigned agent's workload is settled in one place,
//! [`Tracker::settle_workload`].

use futures::future;
use itertools::Itertools as _;
use time::OffsetDateTime;
use tracing::info;

use crate::db::{
    ticket::{self, Priority, Status},
    user::Role,
    Ticket,
};

use super::{Actor, Error, Tracker};

/// Changes applied to every ticket of a bulk update.
#[derive(Clone, Debug, Default)]
pub struct Bulk {
    pub status: Option<Status>,
    pub priority: Option<Priority>,
    pub note: Option<String>,
}

impl Tracker {
    pub async fn set_status(
        &self,
        actor: &Actor,
        id: ticket::Id,
        status: Status,
    ) -> Result<Ticket, Error> {
        let mut ticket = self.visible_ticket(actor, id).await?;
        if !actor.can_set_status(&ticket) {
            return Err(Error::Unauthorized);
        }

        let now = OffsetDateTime::now_utc();
        let Some(previous) = ticket.set_status(status, &actor.name, now) else {
            return Ok(ticket);
        };
        self.store.write_ticket(&ticket).await?;
        self.settle_workload(&ticket, previous, now).await?;

        info!(
            ticket = %ticket.id,
            from = ?previous,
            to = ?status,
            actor = %actor.user,
            "ticket status changed",
        );
        Ok(ticket)
    }

    /// Keeps the assignee's workload in line with a status change that has
    /// already been written.
    pub(super) async fn settle_workload(
        &self,
        ticket: &Ticket,
        previous: Status,
        now: OffsetDateTime,
    ) -> Result<(), Error> {
        let Some(agent) = ticket.assigned_to else {
            return Ok(());
        };
        match (previous.is_open(), ticket.status.is_open()) {
            (true, false) => {
                let resolved_in = now - ticket.created_at;
                self.store.release_agent(agent, Some(resolved_in)).await?
            }
            (false, true) => self.store.retain_agent(agent).await?,
            _ => {}
        }
        Ok(())
    }

    /// Flags a ticket for elevated attention.
    ///
    /// Repeating it overwrites the reason. Priority is raised to at least
    /// `high`, status is left as is.
    pub async fn escalate(
        &self,
        actor: &Actor,
        id: ticket::Id,
        reason: &str,
    ) -> Result<Ticket, Error> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(Error::Validation("escalation reason is required"));
        }
        let mut ticket = self.visible_ticket(actor, id).await?;
        if ticket.status == Status::Closed {
            return Err(Error::Validation("closed tickets can't be escalated"));
        }

        ticket.escalated = true;
        ticket.escalation_reason = Some(reason.to_owned());
        ticket.priority = ticket.priority.max(Priority::High);
        ticket.updated_at = OffsetDateTime::now_utc();
        self.store.write_ticket(&ticket).await?;

        info!(ticket = %ticket.id, actor = %actor.user, "ticket escalated");
        Ok(ticket)
    }

    /// Appends an internal note. Only staff writes them.
    pub async fn add_comment(
        &self,
        actor: &Actor,
        id: ticket::Id,
        body: &str,
    ) -> Result<Ticket, Error> {
        if !actor.role.is_staff() {
            return Err(Error::Unauthorized);
        }
        let body = body.trim();
        if body.is_empty() {
            return Err(Error::Validation("comment is required"));
        }
        let mut ticket = self.load_ticket(id).await?;

        ticket.add_note(body, &actor.name, OffsetDateTime::now_utc());
        self.store.write_ticket(&ticket).await?;

        info!(ticket = %ticket.id, actor = %actor.user, "note added");
        Ok(ticket)
    }

    /// Rates how a finished ticket was handled. Each ticket is rated once,
    /// by the customer who reported it.
    pub async fn submit_feedback(
        &self,
        actor: &Actor,
        id: ticket::Id,
        rating: u8,
    ) -> Result<Ticket, Error> {
        if actor.role != Role::Customer {
            return Err(Error::Unauthorized);
        }
        if !(1..=5).contains(&rating) {
            return Err(Error::Validation("rating must be between 1 and 5"));
        }
        let mut ticket = self.visible_ticket(actor, id).await?;
        if ticket.status.is_open() {
            return Err(Error::Validation(
                "only resolved or closed tickets can be rated",
            ));
        }
        if ticket.feedback_rating.is_some() {
            return Err(Error::Conflict("feedback was already submitted"));
        }

        let now = OffsetDateTime::now_utc();
        ticket.feedback_rating = Some(rating);
        ticket.feedback_date = Some(now);
        ticket.updated_at = now;
        self.store.write_ticket(&ticket).await?;
        if let Some(agent) = ticket.assigned_to {
            self.store.record_rating(agent, rating).await?;
        }

        info!(ticket = %ticket.id, rating, "feedback submitted");
        Ok(ticket)
    }

    /// Applies the same changes to several tickets.
    ///
    /// Nothing is written unless every ticket exists. Repeated ids are
    /// updated once.
    pub async fn bulk_update(
        &self,
        actor: &Actor,
        ids: &[ticket::Id],
        bulk: Bulk,
    ) -> Result<Vec<Ticket>, Error> {
        actor.require_admin()?;
        let note = bulk.note.as_deref().map(str::trim).filter(|n| !n.is_empty());
        let mut tickets = future::try_join_all(
            ids.iter().unique().map(|&id| self.load_ticket(id)),
        )
        .await?;

        let now = OffsetDateTime::now_utc();
        for ticket in &mut tickets {
            if let Some(priority) = bulk.priority {
                ticket.priority = priority;
            }
            if let Some(note) = note {
                ticket.add_note(note, &actor.name, now);
            }
            ticket.updated_at = now;
            let previous = bulk
                .status
                .and_then(|s| ticket.set_status(s, &actor.name, now));

            self.store.write_ticket(ticket).await?;
            if let Some(previous) = previous {
                self.settle_workload(ticket, previous, now).await?;
            }
        }

        info!(
            tickets = tickets.len(),
            actor = %actor.user,
            status = ?bulk.status,
            priority = ?bulk.priority,
            "bulk update applied",
        );
        Ok(tickets)
    }
}

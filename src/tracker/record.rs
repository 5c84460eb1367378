//! Creating, reading, patching and deleting tickets.

use time::OffsetDateTime;
use tracing::info;

use crate::{
    api::ticket::{Draft, Patch},
    config,
    db::{
        agent, customer,
        ticket::{self, Filter, HistoryEntry, Priority, Status},
        user::Role,
        Ticket,
    },
};

use super::{Actor, Error, Tracker};

/// Name recorded for changes nobody in particular made.
pub const SYSTEM: &str = "System";

/// When a ticket of `priority` reported at `created_at` is due.
pub fn sla_deadline(
    priority: Priority,
    created_at: OffsetDateTime,
    sla: &config::Sla,
) -> OffsetDateTime {
    if priority.is_urgent() {
        created_at + sla.urgent
    } else {
        created_at + sla.standard
    }
}

fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

/// Builds a fresh `new` ticket owned by `customer`.
pub fn open_ticket(
    draft: Draft,
    customer: customer::Id,
    sla: &config::Sla,
    now: OffsetDateTime,
) -> Result<Ticket, Error> {
    if is_blank(&draft.subject) || is_blank(&draft.description) {
        return Err(Error::Validation("subject and description are required"));
    }
    let priority = draft.priority.unwrap_or_default();
    Ok(Ticket {
        id: ticket::Id::new(),
        subject: draft.subject,
        description: draft.description,
        category: draft.category,
        domain: draft.domain,
        product: draft.product,
        operation_type: draft.operation_type,
        priority,
        complexity: draft.complexity.unwrap_or_default(),
        severity: draft.severity.unwrap_or_default(),
        kind: draft.kind.unwrap_or_default(),
        region: draft.region,
        country: draft.country,
        account: draft.account,
        skills_required: draft.skills_required,
        tags: draft.tags,
        security_restriction: draft.security_restriction,
        status: Status::New,
        customer,
        assigned_to: None,
        created_at: now,
        updated_at: now,
        sla_deadline: sla_deadline(priority, now, sla),
        escalated: false,
        escalation_reason: None,
        feedback_rating: None,
        feedback_date: None,
        internal_notes: vec![],
        history: vec![HistoryEntry {
            status: Status::New,
            changed_at: now,
            changed_by: SYSTEM.to_owned(),
        }],
    })
}

/// Applies every field of `patch` except `status`, which has to go through
/// [`Ticket::set_status`].
fn apply_fields(ticket: &mut Ticket, patch: Patch) -> Result<(), Error> {
    let Patch {
        subject,
        description,
        category,
        domain,
        product,
        operation_type,
        priority,
        complexity,
        severity,
        kind,
        region,
        country,
        account,
        skills_required,
        tags,
        security_restriction,
        status: _,
    } = patch;

    if subject.as_deref().is_some_and(is_blank)
        || description.as_deref().is_some_and(is_blank)
    {
        return Err(Error::Validation("subject and description can't be blank"));
    }

    if let Some(subject) = subject {
        ticket.subject = subject;
    }
    if let Some(description) = description {
        ticket.description = description;
    }
    ticket.category = category.or(ticket.category.take());
    ticket.domain = domain.or(ticket.domain.take());
    ticket.product = product.or(ticket.product.take());
    ticket.operation_type = operation_type.or(ticket.operation_type.take());
    ticket.priority = priority.unwrap_or(ticket.priority);
    ticket.complexity = complexity.unwrap_or(ticket.complexity);
    ticket.severity = severity.unwrap_or(ticket.severity);
    ticket.kind = kind.unwrap_or(ticket.kind);
    ticket.region = region.or(ticket.region.take());
    ticket.country = country.or(ticket.country.take());
    ticket.account = account.or(ticket.account.take());
    if let Some(skills_required) = skills_required {
        ticket.skills_required = skills_required;
    }
    if let Some(tags) = tags {
        ticket.tags = tags;
    }
    ticket.security_restriction =
        security_restriction.unwrap_or(ticket.security_restriction);
    Ok(())
}

impl Tracker {
    /// Reports a new ticket on behalf of the actor's customer profile.
    pub async fn create(
        &self,
        actor: &Actor,
        draft: Draft,
    ) -> Result<Ticket, Error> {
        let customer = actor.customer.ok_or(Error::Validation(
            "tickets can only be reported by customers",
        ))?;
        let ticket =
            open_ticket(draft, customer, &self.sla, OffsetDateTime::now_utc())?;

        self.store.write_ticket(&ticket).await?;

        info!(
            ticket = %ticket.id,
            customer = %customer,
            priority = ?ticket.priority,
            "ticket created",
        );
        Ok(ticket)
    }

    pub async fn get(
        &self,
        actor: &Actor,
        id: ticket::Id,
    ) -> Result<Ticket, Error> {
        self.visible_ticket(actor, id).await
    }

    /// Applies a partial update.
    ///
    /// A status change is recorded in the history the same way
    /// [`Tracker::set_status`] records it. Customers can't change status.
    pub async fn update(
        &self,
        actor: &Actor,
        id: ticket::Id,
        patch: Patch,
    ) -> Result<Ticket, Error> {
        let mut ticket = self.visible_ticket(actor, id).await?;
        if patch.status.is_some() && !actor.can_set_status(&ticket) {
            return Err(Error::Unauthorized);
        }

        let now = OffsetDateTime::now_utc();
        let status = patch.status;
        apply_fields(&mut ticket, patch)?;
        ticket.updated_at = now;
        let previous =
            status.and_then(|s| ticket.set_status(s, &actor.name, now));

        self.store.write_ticket(&ticket).await?;
        if let Some(previous) = previous {
            self.settle_workload(&ticket, previous, now).await?;
        }

        info!(ticket = %ticket.id, actor = %actor.user, "ticket updated");
        Ok(ticket)
    }

    /// Removes a ticket for good, whatever its status. Only its reporter or
    /// an admin may do so.
    pub async fn delete(
        &self,
        actor: &Actor,
        id: ticket::Id,
    ) -> Result<(), Error> {
        let ticket = self.visible_ticket(actor, id).await?;
        match actor.role {
            Role::Admin | Role::Customer => {}
            Role::Agent => return Err(Error::Unauthorized),
        }

        if !self.store.delete_ticket(id).await? {
            return Err(Error::NotFound(super::Entity::Ticket));
        }
        if let Some(agent) = ticket.assigned_to {
            if ticket.status.is_open() {
                self.store.release_agent(agent, None).await?;
            }
        }

        info!(ticket = %id, actor = %actor.user, "ticket deleted");
        Ok(())
    }

    pub async fn list_by_owner(
        &self,
        customer: customer::Id,
    ) -> Result<Vec<Ticket>, Error> {
        let filter = Filter {
            customer: Some(customer),
            ..Default::default()
        };
        Ok(self.store.list_tickets(&filter).await?)
    }

    pub async fn list_by_assignee(
        &self,
        agent: agent::Id,
    ) -> Result<Vec<Ticket>, Error> {
        let filter = Filter {
            assigned_to: Some(agent),
            ..Default::default()
        };
        Ok(self.store.list_tickets(&filter).await?)
    }

    /// Tickets waiting for an agent to pick them up.
    pub async fn list_unassigned(
        &self,
        actor: &Actor,
    ) -> Result<Vec<Ticket>, Error> {
        actor.require_agent()?;
        let filter = Filter {
            unassigned: true,
            ..Default::default()
        };
        let mut tickets = self.store.list_tickets(&filter).await?;
        tickets.retain(|t| t.status.is_open());
        Ok(tickets)
    }

    pub async fn list_admin(
        &self,
        actor: &Actor,
        filter: &Filter,
    ) -> Result<Vec<Ticket>, Error> {
        actor.require_admin()?;
        Ok(self.store.list_tickets(filter).await?)
    }

    /// Tickets held by the acting agent.
    pub async fn list_mine(&self, actor: &Actor) -> Result<Vec<Ticket>, Error> {
        self.list_by_assignee(actor.require_agent()?).await
    }

    /// What the actor's dashboard shows: own tickets for customers, held
    /// ones for agents, everything for admins.
    pub async fn list_for(&self, actor: &Actor) -> Result<Vec<Ticket>, Error> {
        match actor.role {
            Role::Customer => match actor.customer {
                Some(customer) => self.list_by_owner(customer).await,
                None => Ok(vec![]),
            },
            Role::Agent => self.list_mine(actor).await,
            Role::Admin => Ok(self.store.list_tickets(&Filter::default()).await?),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::{
        api::ticket::{Draft, Patch},
        db::{
            ticket::{Complexity, Kind, Priority, Severity, Status},
            user::Role,
            Store as _,
        },
        tracker::{
            tests::{register, report, tracker},
            Entity, Error,
        },
    };

    #[tokio::test]
    async fn creates_ticket_with_defaults() {
        let (tracker, _) = tracker();
        let alice = register(&tracker, "Alice", Role::Customer).await;

        let ticket = report(&tracker, &alice, "Printer on fire").await;

        assert_eq!(ticket.status, Status::New);
        assert_eq!(ticket.priority, Priority::Medium);
        assert_eq!(ticket.complexity, Complexity::Moderate);
        assert_eq!(ticket.severity, Severity::Minor);
        assert_eq!(ticket.kind, Kind::Incident);
        assert_eq!(Some(ticket.customer), alice.customer);
        assert_eq!(ticket.assigned_to, None);
        assert_eq!(ticket.history.len(), 1);
        assert_eq!(ticket.history[0].status, Status::New);
        assert_eq!(ticket.history[0].changed_by, "System");
        assert_eq!(
            ticket.sla_deadline - ticket.created_at,
            Duration::from_secs(168 * 60 * 60),
        );
    }

    #[tokio::test]
    async fn urgent_tickets_get_short_sla() {
        let (tracker, _) = tracker();
        let alice = register(&tracker, "Alice", Role::Customer).await;

        for priority in [Priority::High, Priority::Critical] {
            let ticket = tracker
                .create(
                    &alice,
                    Draft {
                        subject: "VPN down".to_owned(),
                        description: "Nobody can connect".to_owned(),
                        priority: Some(priority),
                        ..Default::default()
                    },
                )
                .await
                .unwrap();
            assert_eq!(
                ticket.sla_deadline - ticket.created_at,
                Duration::from_secs(72 * 60 * 60),
            );
        }

        let low = tracker
            .create(
                &alice,
                Draft {
                    subject: "Typo".to_owned(),
                    description: "In the footer".to_owned(),
                    priority: Some(Priority::Low),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(
            low.sla_deadline - low.created_at,
            Duration::from_secs(168 * 60 * 60),
        );
    }

    #[tokio::test]
    async fn rejects_blank_subject_or_description() {
        let (tracker, store) = tracker();
        let alice = register(&tracker, "Alice", Role::Customer).await;

        for (subject, description) in
            [("", "Details"), ("Subject", ""), ("   ", "Details")]
        {
            let err = tracker
                .create(
                    &alice,
                    Draft {
                        subject: subject.to_owned(),
                        description: description.to_owned(),
                        ..Default::default()
                    },
                )
                .await
                .unwrap_err();
            assert!(matches!(err, Error::Validation(_)), "{err}");
        }

        let all = store.list_tickets(&Default::default()).await.unwrap();
        assert!(all.is_empty());
    }

    #[tokio::test]
    async fn only_customers_report_tickets() {
        let (tracker, _) = tracker();
        let bob = register(&tracker, "Bob", Role::Agent).await;

        let err = tracker
            .create(
                &bob,
                Draft {
                    subject: "Subject".to_owned(),
                    description: "Details".to_owned(),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)), "{err}");
    }

    #[tokio::test]
    async fn hides_other_customers_tickets() {
        let (tracker, _) = tracker();
        let alice = register(&tracker, "Alice", Role::Customer).await;
        let dave = register(&tracker, "Dave", Role::Customer).await;
        let ticket = report(&tracker, &alice, "Printer on fire").await;

        let err = tracker.get(&dave, ticket.id).await.unwrap_err();
        assert!(matches!(err, Error::Unauthorized), "{err}");
        assert!(tracker.list_for(&dave).await.unwrap().is_empty());
        assert_eq!(tracker.list_for(&alice).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn patch_changing_status_is_recorded_in_history() {
        let (tracker, _) = tracker();
        let alice = register(&tracker, "Alice", Role::Customer).await;
        let carol = register(&tracker, "Carol", Role::Admin).await;
        let ticket = report(&tracker, &alice, "Printer on fire").await;

        let ticket = tracker
            .update(
                &carol,
                ticket.id,
                Patch {
                    priority: Some(Priority::High),
                    status: Some(Status::InProgress),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(ticket.priority, Priority::High);
        assert_eq!(ticket.status, Status::InProgress);
        let last = ticket.history.last().unwrap();
        assert_eq!(last.status, Status::InProgress);
        assert_eq!(last.changed_by, "Carol");
        assert_eq!(ticket.history.len(), 2);
    }

    #[tokio::test]
    async fn patch_without_status_keeps_history() {
        let (tracker, _) = tracker();
        let alice = register(&tracker, "Alice", Role::Customer).await;
        let ticket = report(&tracker, &alice, "Printer on fire").await;

        let updated = tracker
            .update(
                &alice,
                ticket.id,
                Patch {
                    subject: Some("Printer still on fire".to_owned()),
                    tags: Some(vec!["hardware".to_owned()]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.subject, "Printer still on fire");
        assert_eq!(updated.description, ticket.description);
        assert_eq!(updated.tags, ["hardware"]);
        assert_eq!(updated.history, ticket.history);
        assert!(updated.updated_at >= ticket.updated_at);
    }

    #[tokio::test]
    async fn customers_cant_patch_status() {
        let (tracker, _) = tracker();
        let alice = register(&tracker, "Alice", Role::Customer).await;
        let ticket = report(&tracker, &alice, "Printer on fire").await;

        let err = tracker
            .update(
                &alice,
                ticket.id,
                Patch {
                    status: Some(Status::Closed),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unauthorized), "{err}");
    }

    #[tokio::test]
    async fn deletes_ticket_in_any_status() {
        let (tracker, _) = tracker();
        let alice = register(&tracker, "Alice", Role::Customer).await;
        let carol = register(&tracker, "Carol", Role::Admin).await;
        let ticket = report(&tracker, &alice, "Printer on fire").await;
        tracker
            .update(
                &carol,
                ticket.id,
                Patch {
                    status: Some(Status::InProgress),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        tracker.delete(&alice, ticket.id).await.unwrap();

        let err = tracker.get(&alice, ticket.id).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(Entity::Ticket)), "{err}");
    }

    #[tokio::test]
    async fn admin_filters_by_search_and_status() {
        let (tracker, _) = tracker();
        let alice = register(&tracker, "Alice", Role::Customer).await;
        let carol = register(&tracker, "Carol", Role::Admin).await;
        let printer = report(&tracker, &alice, "Printer on fire").await;
        report(&tracker, &alice, "Forgot password").await;

        let found = tracker
            .list_admin(
                &carol,
                &crate::db::ticket::Filter {
                    search: Some("PRINTER".to_owned()),
                    status: Some(Status::New),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, printer.id);

        let err = tracker
            .list_admin(&alice, &Default::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unauthorized), "{err}");
    }

    #[tokio::test]
    async fn unassigned_list_skips_finished_tickets() {
        let (tracker, _) = tracker();
        let alice = register(&tracker, "Alice", Role::Customer).await;
        let bob = register(&tracker, "Bob", Role::Agent).await;
        let carol = register(&tracker, "Carol", Role::Admin).await;
        let printer = report(&tracker, &alice, "Printer on fire").await;
        let password = report(&tracker, &alice, "Forgot password").await;
        tracker
            .update(
                &carol,
                password.id,
                Patch {
                    status: Some(Status::Closed),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let unassigned = tracker.list_unassigned(&bob).await.unwrap();
        assert_eq!(unassigned.len(), 1);
        assert_eq!(unassigned[0].id, printer.id);
    }
}

//! Binding tickets to agents under their capacity ceiling.

use std::collections::HashSet;

use time::OffsetDateTime;
use tracing::info;

use crate::{
    api::agent::Recommendation,
    db::{
        agent::{self, Availability},
        ticket::{self, Status},
        user::Role,
        Agent, Ticket,
    },
};

use super::{record::SYSTEM, Actor, Entity, Error, Tracker};

/// How a ticket gets bound.
#[derive(Clone, Copy, Debug)]
struct Binding<'a> {
    changed_by: &'a str,
    override_capacity: bool,

    /// Refuse tickets that already have an assignee.
    exclusive: bool,
}

impl Tracker {
    /// Binds a ticket to an agent.
    ///
    /// Admins may target any agent and bypass the capacity ceiling. Agents
    /// may only take tickets for themselves, so `agent` has to be omitted or
    /// be their own profile.
    pub async fn assign(
        &self,
        actor: &Actor,
        id: ticket::Id,
        agent: Option<agent::Id>,
        override_capacity: bool,
    ) -> Result<Ticket, Error> {
        let target = match actor.role {
            Role::Admin => match agent {
                Some(agent) => agent,
                None => actor.require_agent()?,
            },
            Role::Agent => {
                let own = actor.require_agent()?;
                if agent.is_some_and(|a| a != own) || override_capacity {
                    return Err(Error::Unauthorized);
                }
                own
            }
            Role::Customer => return Err(Error::Unauthorized),
        };

        self.bind(
            id,
            target,
            Binding {
                changed_by: &actor.name,
                override_capacity,
                exclusive: false,
            },
        )
        .await
    }

    /// Pickup of an unassigned ticket by the acting agent.
    pub async fn self_assign(
        &self,
        actor: &Actor,
        id: ticket::Id,
    ) -> Result<Ticket, Error> {
        let agent = actor.require_agent()?;
        self.bind(
            id,
            agent,
            Binding {
                changed_by: &actor.name,
                override_capacity: false,
                exclusive: true,
            },
        )
        .await
    }

    /// Assigns the ticket to the best scored agent, see [`recommend`].
    pub async fn auto_assign(
        &self,
        actor: &Actor,
        id: ticket::Id,
    ) -> Result<(Ticket, Recommendation), Error> {
        actor.require_admin()?;
        let (ticket, agents) = tokio::try_join!(self.load_ticket(id), async {
            self.store.list_agents().await.map_err(Error::from)
        })?;
        let recommendation = recommend(&ticket, &agents)
            .ok_or(Error::NotFound(Entity::Agent))?;

        let ticket = self
            .bind(
                id,
                recommendation.agent,
                Binding {
                    changed_by: SYSTEM,
                    override_capacity: false,
                    exclusive: false,
                },
            )
            .await?;
        Ok((ticket, recommendation))
    }

    async fn bind(
        &self,
        id: ticket::Id,
        agent: agent::Id,
        binding: Binding<'_>,
    ) -> Result<Ticket, Error> {
        let (mut ticket, target) =
            tokio::try_join!(self.load_ticket(id), async {
                self.store.get_agent_by_id(agent).await.map_err(Error::from)
            })?;
        let target = target.ok_or(Error::NotFound(Entity::Agent))?;

        if ticket.assigned_to == Some(agent) {
            return Err(Error::Conflict(
                "ticket is already assigned to this agent",
            ));
        }
        if binding.exclusive && ticket.assigned_to.is_some() {
            return Err(Error::Conflict("ticket is already assigned"));
        }
        if !ticket.status.is_open() {
            return Err(Error::Validation(
                "resolved or closed tickets can't be assigned",
            ));
        }
        if !binding.override_capacity && target.is_at_capacity() {
            return Err(capacity_exceeded(&target));
        }

        let now = OffsetDateTime::now_utc();
        let previous = ticket.assigned_to.replace(agent);
        ticket.updated_at = now;
        if ticket.status == Status::New {
            ticket.set_status(Status::Assigned, binding.changed_by, now);
        }

        let Some(bound) = self
            .store
            .assign_ticket(&ticket, binding.override_capacity)
            .await?
        else {
            // Someone else took the last slot after the check above.
            let current = self.store.get_agent_by_id(agent).await?;
            let current = current.as_ref().unwrap_or(&target);
            return Err(capacity_exceeded(current));
        };
        if let Some(previous) = previous {
            self.store.release_agent(previous, None).await?;
        }

        info!(
            ticket = %ticket.id,
            agent = %agent,
            workload = bound.workload,
            changed_by = binding.changed_by,
            "ticket assigned",
        );
        Ok(ticket)
    }
}

fn capacity_exceeded(agent: &Agent) -> Error {
    Error::CapacityExceeded {
        agent: agent.id,
        workload: agent.workload,
        max_tickets: agent.max_tickets,
    }
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

/// Share of the agent's skills and expertise areas mentioned by the ticket.
fn skill_match(ticket: &Ticket, agent: &Agent) -> f64 {
    let mentioned = [&ticket.subject, &ticket.description]
        .into_iter()
        .chain(ticket.category.iter())
        .chain(ticket.domain.iter())
        .chain(ticket.product.iter())
        .chain(ticket.operation_type.iter())
        .chain(ticket.skills_required.iter())
        .chain(ticket.tags.iter())
        .flat_map(|text| tokens(text))
        .collect::<HashSet<_>>();

    let terms = agent
        .skills
        .iter()
        .chain(agent.domain_expertise.iter())
        .collect::<Vec<_>>();
    if terms.is_empty() {
        return 0.0;
    }
    let matched = terms
        .iter()
        .filter(|term| {
            let mut words = tokens(term).peekable();
            words.peek().is_some() && words.all(|w| mentioned.contains(&w))
        })
        .count();
    matched as f64 / terms.len() as f64
}

/// Scores an agent for a ticket, in `0.0..=1.0`.
pub fn score(ticket: &Ticket, agent: &Agent) -> f64 {
    let workload = 1.0 / (1.0 + f64::from(agent.workload));
    let experience = (f64::from(agent.experience) / 10.0).min(1.0);
    0.5 * skill_match(ticket, agent) + 0.3 * workload + 0.2 * experience
}

/// Picks the agent best suited to take `ticket`.
///
/// Offline agents and agents at capacity aren't considered. Ties go to the
/// agent listed first.
pub fn recommend(ticket: &Ticket, agents: &[Agent]) -> Option<Recommendation> {
    agents
        .iter()
        .filter(|a| a.availability != Availability::Offline)
        .filter(|a| !a.is_at_capacity())
        .map(|a| Recommendation {
            agent: a.id,
            score: score(ticket, a),
        })
        .fold(None, |best: Option<Recommendation>, candidate| match best {
            Some(best) if best.score >= candidate.score => Some(best),
            _ => Some(candidate),
        })
}

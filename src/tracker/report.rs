//! Dashboard aggregates folded from a role-scoped ticket listing.

use std::collections::{BTreeMap, HashMap};

use itertools::Itertools as _;
use time::OffsetDateTime;

use crate::{
    api::{
        agent::{Workload, WorkloadList},
        report::{AgeRange, Aging, AgingEntry, Stats},
    },
    db::{user, Agent, Ticket, User},
};

use super::{Actor, Error, Tracker};

pub fn compute_stats(tickets: &[Ticket]) -> Stats {
    tickets.iter().fold(Stats::default(), |mut stats, ticket| {
        stats.total_tickets += 1;
        if ticket.escalated {
            stats.escalated_tickets += 1;
        }
        *stats.status_counts.entry(ticket.status).or_default() += 1;
        *stats.priority_counts.entry(ticket.priority).or_default() += 1;
        stats
    })
}

/// Buckets tickets by whole days since creation. Tickets dated in the future
/// are zero days old.
pub fn compute_aging(tickets: &[Ticket], now: OffsetDateTime) -> Aging {
    let mut age_ranges = AgeRange::ALL
        .into_iter()
        .map(|range| (range, 0))
        .collect::<BTreeMap<_, _>>();
    let mut detailed_data = Vec::with_capacity(tickets.len());
    for ticket in tickets {
        let age = (now - ticket.created_at).whole_days().max(0);
        *age_ranges.entry(AgeRange::of(age)).or_default() += 1;
        detailed_data.push(AgingEntry {
            id: ticket.id,
            age,
            status: ticket.status,
            priority: ticket.priority,
        });
    }
    Aging {
        age_ranges,
        detailed_data,
    }
}

/// Rows of the admin workload panel. Agents whose user is missing from
/// `users` are skipped.
pub fn agent_workloads(
    agents: Vec<Agent>,
    users: &HashMap<user::Id, User>,
) -> WorkloadList {
    WorkloadList {
        agents: agents
            .into_iter()
            .filter_map(|agent| {
                let user = users.get(&agent.user)?;
                Some(Workload {
                    id: agent.id,
                    name: user.name.clone(),
                    active_tickets: agent.workload,
                    capacity: agent.max_tickets,
                    availability: agent.availability,
                })
            })
            .collect(),
    }
}

impl Tracker {
    pub async fn stats(&self, actor: &Actor) -> Result<Stats, Error> {
        Ok(compute_stats(&self.list_for(actor).await?))
    }

    pub async fn aging(&self, actor: &Actor) -> Result<Aging, Error> {
        let tickets = self.list_for(actor).await?;
        Ok(compute_aging(&tickets, OffsetDateTime::now_utc()))
    }

    pub async fn workloads(&self, actor: &Actor) -> Result<WorkloadList, Error> {
        actor.require_admin()?;
        let agents = self.store.list_agents().await?;
        let ids = agents.iter().map(|a| a.user).unique().collect::<Vec<_>>();
        let users = self.store.get_users_by_ids(&ids).await?;
        Ok(agent_workloads(agents, &users))
    }
}

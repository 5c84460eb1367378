//! [`super::Store`] kept in process memory.
//!
//! Used for local runs (`backend = "memory"`) and by the test suites. Every
//! operation holds one lock over all collections, so multi-record writes
//! such as [`super::Store::assign_ticket`] are atomic here as well.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{
    agent, customer, ticket, user, Agent, Customer, Error, Profile, Ticket,
    User,
};

#[derive(Default)]
pub struct Store(Mutex<State>);

#[derive(Default)]
struct State {
    users: HashMap<user::Id, User>,
    customers: HashMap<customer::Id, Customer>,
    agents: HashMap<agent::Id, Agent>,
    tickets: HashMap<ticket::Id, Ticket>,
}

#[async_trait]
impl super::Store for Store {
    async fn get_user_by_id(&self, id: user::Id) -> Result<Option<User>, Error> {
        Ok(self.0.lock().await.users.get(&id).cloned())
    }

    async fn get_user_by_email(
        &self,
        email: &str,
    ) -> Result<Option<User>, Error> {
        let state = self.0.lock().await;
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }

    async fn get_users_by_ids(
        &self,
        ids: &[user::Id],
    ) -> Result<HashMap<user::Id, User>, Error> {
        let state = self.0.lock().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.users.get(id))
            .map(|user| (user.id, user.clone()))
            .collect())
    }

    async fn create_user(
        &self,
        user: &User,
        profile: &Profile,
    ) -> Result<bool, Error> {
        let mut state = self.0.lock().await;
        if state.users.values().any(|u| u.email == user.email) {
            return Ok(false);
        }
        state.users.insert(user.id, user.clone());
        match profile {
            Profile::Customer(customer) => {
                state.customers.insert(customer.id, customer.clone());
            }
            Profile::Agent(agent) => {
                state.agents.insert(agent.id, agent.clone());
            }
        }
        Ok(true)
    }

    async fn get_customer_by_user(
        &self,
        user: user::Id,
    ) -> Result<Option<Customer>, Error> {
        let state = self.0.lock().await;
        Ok(state.customers.values().find(|c| c.user == user).cloned())
    }

    async fn write_agent(&self, agent: &Agent) -> Result<(), Error> {
        let mut state = self.0.lock().await;
        let agent = match state.agents.get(&agent.id) {
            Some(stored) => Agent {
                workload: stored.workload,
                total_tickets_resolved: stored.total_tickets_resolved,
                avg_resolution_time: stored.avg_resolution_time,
                avg_customer_rating: stored.avg_customer_rating,
                rated_tickets: stored.rated_tickets,
                ..agent.clone()
            },
            None => agent.clone(),
        };
        state.agents.insert(agent.id, agent);
        Ok(())
    }

    async fn get_agent_by_id(
        &self,
        id: agent::Id,
    ) -> Result<Option<Agent>, Error> {
        Ok(self.0.lock().await.agents.get(&id).cloned())
    }

    async fn get_agent_by_user(
        &self,
        user: user::Id,
    ) -> Result<Option<Agent>, Error> {
        let state = self.0.lock().await;
        Ok(state.agents.values().find(|a| a.user == user).cloned())
    }

    async fn list_agents(&self) -> Result<Vec<Agent>, Error> {
        let state = self.0.lock().await;
        let mut agents = state.agents.values().cloned().collect::<Vec<_>>();
        agents.sort_by_key(|a| (a.created_at, a.id));
        Ok(agents)
    }

    async fn get_ticket_by_id(
        &self,
        id: ticket::Id,
    ) -> Result<Option<Ticket>, Error> {
        Ok(self.0.lock().await.tickets.get(&id).cloned())
    }

    async fn write_ticket(&self, ticket: &Ticket) -> Result<(), Error> {
        let mut state = self.0.lock().await;
        state.tickets.insert(ticket.id, ticket.clone());
        Ok(())
    }

    async fn delete_ticket(&self, id: ticket::Id) -> Result<bool, Error> {
        Ok(self.0.lock().await.tickets.remove(&id).is_some())
    }

    async fn list_tickets(
        &self,
        filter: &ticket::Filter,
    ) -> Result<Vec<Ticket>, Error> {
        let state = self.0.lock().await;
        let mut tickets = state
            .tickets
            .values()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect::<Vec<_>>();
        tickets.sort_by(|a, b| {
            b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id))
        });
        Ok(tickets)
    }

    async fn assign_ticket(
        &self,
        ticket: &Ticket,
        override_capacity: bool,
    ) -> Result<Option<Agent>, Error> {
        let mut state = self.0.lock().await;
        let Some(id) = ticket.assigned_to else {
            return Ok(None);
        };
        let Some(agent) = state.agents.get_mut(&id) else {
            return Ok(None);
        };
        if !override_capacity && agent.is_at_capacity() {
            return Ok(None);
        }
        agent.workload += 1;
        let agent = agent.clone();
        if let Some(stored) = state.tickets.get_mut(&ticket.id) {
            stored.assigned_to = ticket.assigned_to;
            stored.status = ticket.status;
            stored.history.clone_from(&ticket.history);
            stored.updated_at = ticket.updated_at;
        }
        Ok(Some(agent))
    }

    async fn release_agent(
        &self,
        id: agent::Id,
        resolved_in: Option<time::Duration>,
    ) -> Result<(), Error> {
        if let Some(agent) = self.0.lock().await.agents.get_mut(&id) {
            agent.release(resolved_in);
        }
        Ok(())
    }

    async fn retain_agent(&self, id: agent::Id) -> Result<(), Error> {
        if let Some(agent) = self.0.lock().await.agents.get_mut(&id) {
            agent.workload += 1;
        }
        Ok(())
    }

    async fn record_rating(
        &self,
        id: agent::Id,
        rating: u8,
    ) -> Result<(), Error> {
        if let Some(agent) = self.0.lock().await.agents.get_mut(&id) {
            agent.record_rating(rating);
        }
        Ok(())
    }
}

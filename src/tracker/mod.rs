//! Ticket lifecycle rules on top of a [`Store`].
//!
//! Every operation takes the [`Actor`] performing it and checks what that
//! actor's role is allowed to touch before anything is written.

mod account;
pub mod assignment;
pub mod lifecycle;
pub mod record;
pub mod report;
mod staff;

use std::sync::Arc;

use derive_more::{Display, From};

use crate::{
    config,
    db::{self, agent, customer, ticket, user, Store, Ticket},
};

pub use self::account::Registration;

pub struct Tracker {
    store: Arc<dyn Store>,
    sla: config::Sla,
    agents: config::Agents,
}

impl Tracker {
    pub fn new(
        store: Arc<dyn Store>,
        sla: config::Sla,
        agents: config::Agents,
    ) -> Self {
        Self { store, sla, agents }
    }

    /// Resolves an authenticated user together with their profile.
    pub async fn actor(&self, id: user::Id) -> Result<Actor, Error> {
        let (user, customer, agent) = tokio::try_join!(
            self.store.get_user_by_id(id),
            self.store.get_customer_by_user(id),
            self.store.get_agent_by_user(id),
        )?;
        let user = user.ok_or(Error::NotFound(Entity::User))?;
        Ok(Actor {
            user: user.id,
            name: user.name,
            role: user.role,
            customer: customer.map(|c| c.id),
            agent: agent.map(|a| a.id),
        })
    }

    async fn load_ticket(&self, id: ticket::Id) -> Result<Ticket, Error> {
        self.store
            .get_ticket_by_id(id)
            .await?
            .ok_or(Error::NotFound(Entity::Ticket))
    }

    /// Loads a ticket the actor is allowed to see.
    async fn visible_ticket(
        &self,
        actor: &Actor,
        id: ticket::Id,
    ) -> Result<Ticket, Error> {
        let ticket = self.load_ticket(id).await?;
        if !actor.can_view(&ticket) {
            return Err(Error::Unauthorized);
        }
        Ok(ticket)
    }
}

/// Who performs an operation.
#[derive(Clone, Debug)]
pub struct Actor {
    pub user: user::Id,
    pub name: String,
    pub role: user::Role,
    pub customer: Option<customer::Id>,
    pub agent: Option<agent::Id>,
}

impl Actor {
    /// Customers only see their own tickets; staff sees everything.
    pub fn can_view(&self, ticket: &Ticket) -> bool {
        match self.role {
            user::Role::Customer => self.customer == Some(ticket.customer),
            user::Role::Agent | user::Role::Admin => true,
        }
    }

    /// Admins move any ticket, agents only the ones they hold.
    pub fn can_set_status(&self, ticket: &Ticket) -> bool {
        match self.role {
            user::Role::Admin => true,
            user::Role::Agent => {
                self.agent.is_some() && ticket.assigned_to == self.agent
            }
            user::Role::Customer => false,
        }
    }

    pub fn require_admin(&self) -> Result<(), Error> {
        if self.role != user::Role::Admin {
            return Err(Error::Unauthorized);
        }
        Ok(())
    }

    /// The agent profile of a staff member.
    pub fn require_agent(&self) -> Result<agent::Id, Error> {
        match self.agent {
            Some(id) if self.role.is_staff() => Ok(id),
            _ => Err(Error::Unauthorized),
        }
    }
}

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum Entity {
    #[display("agent")]
    Agent,
    #[display("customer")]
    Customer,
    #[display("ticket")]
    Ticket,
    #[display("user")]
    User,
}

#[derive(Debug, Display, From)]
pub enum Error {
    #[display("{_0}")]
    Validation(&'static str),

    #[display("{_0} not found")]
    NotFound(Entity),

    #[display("{_0}")]
    Conflict(&'static str),

    #[display(
        "agent {agent} is at capacity ({workload}/{max_tickets} tickets)"
    )]
    CapacityExceeded {
        agent: agent::Id,
        workload: u32,
        max_tickets: u32,
    },

    #[display("not allowed for this role")]
    Unauthorized,

    #[display("{_0}")]
    #[from]
    Db(db::Error),
}

impl std::error::Error for Error {}

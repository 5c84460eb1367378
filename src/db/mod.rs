/// Declares a UUID-backed identifier stored as a Postgres `UUID`.
macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Clone,
            Copy,
            Debug,
            Default,
            serde::Deserialize,
            derive_more::Display,
            Eq,
            Hash,
            Ord,
            PartialEq,
            PartialOrd,
            serde::Serialize,
        )]
        pub struct $name(uuid::Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(uuid::Uuid::new_v4())
            }
        }

        impl From<u128> for $name {
            fn from(value: u128) -> Self {
                Self(uuid::Uuid::from_u128(value))
            }
        }

        impl tokio_postgres::types::FromSql<'_> for $name {
            tokio_postgres::types::accepts!(UUID);

            fn from_sql(
                ty: &tokio_postgres::types::Type,
                raw: &[u8],
            ) -> Result<Self, Box<dyn std::error::Error + Sync + Send>> {
                <uuid::Uuid as tokio_postgres::types::FromSql>::from_sql(
                    ty, raw,
                )
                .map(Self)
            }
        }

        impl tokio_postgres::types::ToSql for $name {
            tokio_postgres::types::accepts!(UUID);

            tokio_postgres::types::to_sql_checked!();

            fn to_sql(
                &self,
                ty: &tokio_postgres::types::Type,
                out: &mut tokio_postgres::types::private::BytesMut,
            ) -> Result<
                tokio_postgres::types::IsNull,
                Box<dyn std::error::Error + Sync + Send>,
            > {
                tokio_postgres::types::ToSql::to_sql(&self.0, ty, out)
            }
        }
    };
}

/// Stores a `#[repr(u8)]` enum deriving `TryFromRepr` as a Postgres
/// `SMALLINT`.
macro_rules! int2_enum {
    ($name:ty, $what:literal) => {
        impl tokio_postgres::types::FromSql<'_> for $name {
            tokio_postgres::types::accepts!(INT2);

            fn from_sql(
                ty: &tokio_postgres::types::Type,
                raw: &[u8],
            ) -> Result<Self, Box<dyn std::error::Error + Sync + Send>> {
                let repr =
                    <i16 as tokio_postgres::types::FromSql>::from_sql(ty, raw)?;
                let repr = u8::try_from(repr)?;
                let value = Self::try_from(repr)
                    .map_err(|_| concat!("invalid ", $what))?;
                Ok(value)
            }
        }

        impl tokio_postgres::types::ToSql for $name {
            tokio_postgres::types::accepts!(INT2);

            tokio_postgres::types::to_sql_checked!();

            fn to_sql(
                &self,
                ty: &tokio_postgres::types::Type,
                out: &mut tokio_postgres::types::private::BytesMut,
            ) -> Result<
                tokio_postgres::types::IsNull,
                Box<dyn std::error::Error + Sync + Send>,
            > {
                let repr = i16::from((*self) as u8);
                tokio_postgres::types::ToSql::to_sql(&repr, ty, out)
            }
        }
    };
}

pub mod agent;
pub mod customer;
pub mod memory;
pub mod ticket;
pub mod user;

use std::collections::HashMap;

use async_trait::async_trait;
use derive_more::{Display, From};
use tokio_postgres::{tls::NoTlsStream, NoTls, Socket};

pub use self::{
    agent::Agent,
    customer::Customer,
    ticket::Ticket,
    user::{Profile, User},
};

pub type Connection = tokio_postgres::Connection<Socket, NoTlsStream>;

pub async fn connect(url: &str) -> Result<(Client, Connection), Error> {
    let (client, connection) = tokio_postgres::connect(url, NoTls).await?;
    Ok((Client(client), connection))
}

pub struct Client(tokio_postgres::Client);

#[derive(Debug, Display, From)]
pub enum Error {
    #[display("postgres: {_0}")]
    #[from]
    Postgres(tokio_postgres::Error),

    /// A stored value is outside of the range its column allows.
    #[display("corrupted column `{_0}`")]
    Corrupted(&'static str),
}

impl std::error::Error for Error {}

/// Persistence of users, their profiles and tickets.
///
/// Implemented by the Postgres [`Client`] and by [`memory::Store`].
#[async_trait]
pub trait Store: Send + Sync {
    async fn get_user_by_id(&self, id: user::Id) -> Result<Option<User>, Error>;

    async fn get_user_by_email(
        &self,
        email: &str,
    ) -> Result<Option<User>, Error>;

    async fn get_users_by_ids(
        &self,
        ids: &[user::Id],
    ) -> Result<HashMap<user::Id, User>, Error>;

    /// Returns `false` without writing when the email is already taken.
    /// Creates `user` along with its `profile`, both or neither.
    ///
    /// Returns `false` when the email is already registered.
    async fn create_user(
        &self,
        user: &User,
        profile: &Profile,
    ) -> Result<bool, Error>;

    async fn get_customer_by_user(
        &self,
        user: user::Id,
    ) -> Result<Option<Customer>, Error>;

    async fn write_agent(&self, agent: &Agent) -> Result<(), Error>;

    async fn get_agent_by_id(
        &self,
        id: agent::Id,
    ) -> Result<Option<Agent>, Error>;

    async fn get_agent_by_user(
        &self,
        user: user::Id,
    ) -> Result<Option<Agent>, Error>;

    async fn list_agents(&self) -> Result<Vec<Agent>, Error>;

    async fn get_ticket_by_id(
        &self,
        id: ticket::Id,
    ) -> Result<Option<Ticket>, Error>;

    async fn write_ticket(&self, ticket: &Ticket) -> Result<(), Error>;

    /// Returns `false` when there was nothing to delete.
    async fn delete_ticket(&self, id: ticket::Id) -> Result<bool, Error>;

    /// Newest first.
    async fn list_tickets(
        &self,
        filter: &ticket::Filter,
    ) -> Result<Vec<Ticket>, Error>;

    /// Takes one unit of workload from the agent in `ticket.assigned_to` and
    /// writes `ticket`, as one atomic step.
    ///
    /// Unless `override_capacity` is set, nothing is written and `None` is
    /// returned when the agent is already at `max_tickets`. Otherwise
    /// returns the agent as updated.
    async fn assign_ticket(
        &self,
        ticket: &Ticket,
        override_capacity: bool,
    ) -> Result<Option<Agent>, Error>;

    /// Gives one unit of workload back, never going below zero. With
    /// `resolved_in` set, also folds the resolution time into the agent's
    /// metrics.
    async fn release_agent(
        &self,
        id: agent::Id,
        resolved_in: Option<time::Duration>,
    ) -> Result<(), Error>;

    /// Takes one unit of workload regardless of capacity.
    async fn retain_agent(&self, id: agent::Id) -> Result<(), Error>;

    async fn record_rating(
        &self,
        id: agent::Id,
        rating: u8,
    ) -> Result<(), Error>;
}

#[async_trait]
impl Store for Client {
    async fn get_user_by_id(&self, id: user::Id) -> Result<Option<User>, Error> {
        self.get_user_by_id(id).await
    }

    async fn get_user_by_email(
        &self,
        email: &str,
    ) -> Result<Option<User>, Error> {
        self.get_user_by_email(email).await
    }

    async fn get_users_by_ids(
        &self,
        ids: &[user::Id],
    ) -> Result<HashMap<user::Id, User>, Error> {
        self.get_users_by_ids(ids).await
    }

    async fn create_user(
        &self,
        user: &User,
        profile: &Profile,
    ) -> Result<bool, Error> {
        self.create_user(user, profile).await
    }

    async fn get_customer_by_user(
        &self,
        user: user::Id,
    ) -> Result<Option<Customer>, Error> {
        self.get_customer_by_user(user).await
    }

    async fn write_agent(&self, agent: &Agent) -> Result<(), Error> {
        self.write_agent(agent).await
    }

    async fn get_agent_by_id(
        &self,
        id: agent::Id,
    ) -> Result<Option<Agent>, Error> {
        self.get_agent_by_id(id).await
    }

    async fn get_agent_by_user(
        &self,
        user: user::Id,
    ) -> Result<Option<Agent>, Error> {
        self.get_agent_by_user(user).await
    }

    async fn list_agents(&self) -> Result<Vec<Agent>, Error> {
        self.list_agents().await
    }

    async fn get_ticket_by_id(
        &self,
        id: ticket::Id,
    ) -> Result<Option<Ticket>, Error> {
        self.get_ticket_by_id(id).await
    }

    async fn write_ticket(&self, ticket: &Ticket) -> Result<(), Error> {
        self.write_ticket(ticket).await
    }

    async fn delete_ticket(&self, id: ticket::Id) -> Result<bool, Error> {
        self.delete_ticket(id).await
    }

    async fn list_tickets(
        &self,
        filter: &ticket::Filter,
    ) -> Result<Vec<Ticket>, Error> {
        self.list_tickets(filter).await
    }

    async fn assign_ticket(
        &self,
        ticket: &Ticket,
        override_capacity: bool,
    ) -> Result<Option<Agent>, Error> {
        self.assign_ticket(ticket, override_capacity).await
    }

    async fn release_agent(
        &self,
        id: agent::Id,
        resolved_in: Option<time::Duration>,
    ) -> Result<(), Error> {
        self.release_agent(id, resolved_in).await
    }

    async fn retain_agent(&self, id: agent::Id) -> Result<(), Error> {
        self.retain_agent(id).await
    }

    async fn record_rating(
        &self,
        id: agent::Id,
        rating: u8,
    ) -> Result<(), Error> {
        self.record_rating(id, rating).await
    }
}

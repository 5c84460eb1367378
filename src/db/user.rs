use std::{collections::HashMap, error::Error as StdError};

use enum_utils::TryFromRepr;
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use tokio_postgres::{
    types::{
        accepts, private::BytesMut, to_sql_checked, FromSql, IsNull, ToSql,
        Type,
    },
    Row,
};

use super::{Agent, Client, Customer, Error};

/// The record a user's role works through.
#[derive(Clone, Debug)]
pub enum Profile {
    Customer(Customer),
    Agent(Agent),
}

#[derive(Clone, Debug)]
pub struct User {
    pub id: Id,
    pub name: String,
    pub email: String,
    pub password_hash: PasswordHash,
    pub role: Role,
}

impl TryFrom<&Row> for User {
    type Error = Error;

    fn try_from(row: &Row) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            role: row.try_get("role")?,
        })
    }
}

uuid_id!(Id);

#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Eq,
    Hash,
    TryFromRepr,
    PartialEq,
    Serialize,
)]
#[repr(u8)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer = 1,
    Agent = 2,
    Admin = 3,
}

int2_enum!(Role, "role");

impl Role {
    /// Agents and admins both work tickets and carry an agent profile.
    pub fn is_staff(self) -> bool {
        matches!(self, Self::Agent | Self::Admin)
    }
}

/// Hex-encoded SHA-256 digest of a password.
#[derive(Clone, Debug, PartialEq)]
pub struct PasswordHash(String);

impl PasswordHash {
    pub fn new(secret: &str) -> Self {
        Self(format!("{:x}", Sha256::digest(secret.as_bytes())))
    }
}

impl FromSql<'_> for PasswordHash {
    accepts!(TEXT);

    fn from_sql(
        ty: &Type,
        raw: &[u8],
    ) -> Result<Self, Box<dyn StdError + Sync + Send>> {
        String::from_sql(ty, raw).map(Self)
    }
}

impl ToSql for PasswordHash {
    accepts!(TEXT);

    to_sql_checked!();

    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn StdError + Sync + Send>> {
        self.0.to_sql(ty, out)
    }
}

impl Client {
    pub async fn get_user_by_email(
        &self,
        email: &str,
    ) -> Result<Option<User>, Error> {
        const SQL: &str = "SELECT id, name, email, password_hash, role \
                           FROM users \
                           WHERE email = $1 \
                           LIMIT 1";
        self.0
            .query_opt(SQL, &[&email])
            .await?
            .as_ref()
            .map(User::try_from)
            .transpose()
    }

    pub async fn get_user_by_id(&self, id: Id) -> Result<Option<User>, Error> {
        const SQL: &str = "SELECT id, name, email, password_hash, role \
                           FROM users \
                           WHERE id = $1 \
                           LIMIT 1";
        self.0
            .query_opt(SQL, &[&id])
            .await?
            .as_ref()
            .map(User::try_from)
            .transpose()
    }

    pub async fn get_users_by_ids(
        &self,
        ids: &[Id],
    ) -> Result<HashMap<Id, User>, Error> {
        const SQL: &str = "SELECT id, name, email, password_hash, role \
                           FROM users \
                           WHERE id IN (SELECT unnest($1::UUID[])) \
                           LIMIT $2";

        let limit = i64::try_from(ids.len()).unwrap_or(i64::MAX);

        self.0
            .query(SQL, &[&ids, &limit])
            .await?
            .iter()
            .map(|row| User::try_from(row).map(|user| (user.id, user)))
            .collect()
    }

    /// Inserts `user` together with its `profile` in one statement.
    ///
    /// Returns `false` and writes nothing when the email is taken.
    pub async fn create_user(
        &self,
        user: &User,
        profile: &Profile,
    ) -> Result<bool, Error> {
        const CUSTOMER_SQL: &str = "\
            WITH inserted AS ( \
                INSERT INTO users (id, name, email, password_hash, role) \
                VALUES ($1, $2, $3, $4, $5) \
                ON CONFLICT (email) DO NOTHING \
                RETURNING id \
            ) \
            INSERT INTO customers (id, user_id, organization, created_at) \
            SELECT $6, id, $7, $8 FROM inserted";
        const AGENT_SQL: &str = "\
            WITH inserted AS ( \
                INSERT INTO users (id, name, email, password_hash, role) \
                VALUES ($1, $2, $3, $4, $5) \
                ON CONFLICT (email) DO NOTHING \
                RETURNING id \
            ) \
            INSERT INTO agents (id, user_id, skills, domain_expertise, \
                                experience, certifications, max_tickets, \
                                workload, availability, \
                                total_tickets_resolved, avg_resolution_time, \
                                avg_customer_rating, rated_tickets, \
                                created_at) \
            SELECT $6, id, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, \
                   $17, $18 \
            FROM inserted";

        let user_params: [&(dyn ToSql + Sync); 5] = [
            &user.id,
            &user.name,
            &user.email,
            &user.password_hash,
            &user.role,
        ];
        let inserted = match profile {
            Profile::Customer(customer) => {
                let params: [&(dyn ToSql + Sync); 3] = [
                    &customer.id,
                    &customer.organization,
                    &customer.created_at,
                ];
                let params = user_params.iter().chain(&params).copied();
                self.0
                    .execute(CUSTOMER_SQL, &params.collect::<Vec<_>>())
                    .await?
            }
            Profile::Agent(agent) => {
                let experience = agent.experience as i32;
                let max_tickets = agent.max_tickets as i32;
                let workload = agent.workload as i32;
                let resolved = agent.total_tickets_resolved as i32;
                let rated = agent.rated_tickets as i32;
                let params: [&(dyn ToSql + Sync); 13] = [
                    &agent.id,
                    &agent.skills,
                    &agent.domain_expertise,
                    &experience,
                    &agent.certifications,
                    &max_tickets,
                    &workload,
                    &agent.availability,
                    &resolved,
                    &agent.avg_resolution_time,
                    &agent.avg_customer_rating,
                    &rated,
                    &agent.created_at,
                ];
                let params = user_params.iter().chain(&params).copied();
                self.0
                    .execute(AGENT_SQL, &params.collect::<Vec<_>>())
                    .await?
            }
        };
        Ok(inserted == 1)
    }
}

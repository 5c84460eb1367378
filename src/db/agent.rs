use enum_utils::TryFromRepr;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio_postgres::Row;

use super::{ticket, user, Client, Error, Ticket};

#[derive(Clone, Debug)]
pub struct Agent {
    pub id: Id,
    pub user: user::Id,
    pub skills: Vec<String>,
    pub domain_expertise: Vec<String>,

    /// Years.
    pub experience: u32,
    pub certifications: Vec<String>,

    /// Workload ceiling enforced on assignment unless overridden.
    pub max_tickets: u32,

    /// Tickets currently held. Maintained alongside assignments rather than
    /// counted from the tickets table.
    pub workload: u32,
    pub availability: Availability,
    pub total_tickets_resolved: u32,

    /// Hours, averaged over `total_tickets_resolved`.
    pub avg_resolution_time: f64,

    /// Averaged over `rated_tickets`.
    pub avg_customer_rating: f64,
    pub rated_tickets: u32,
    pub created_at: OffsetDateTime,
}

impl Agent {
    pub fn new(user: user::Id, max_tickets: u32, now: OffsetDateTime) -> Self {
        Self {
            id: Id::new(),
            user,
            skills: vec![],
            domain_expertise: vec![],
            experience: 0,
            certifications: vec![],
            max_tickets,
            workload: 0,
            availability: Availability::Online,
            total_tickets_resolved: 0,
            avg_resolution_time: 0.0,
            avg_customer_rating: 0.0,
            rated_tickets: 0,
            created_at: now,
        }
    }

    pub fn is_at_capacity(&self) -> bool {
        self.workload >= self.max_tickets
    }

    pub fn release(&mut self, resolved_in: Option<time::Duration>) {
        self.workload = self.workload.saturating_sub(1);
        if let Some(resolved_in) = resolved_in {
            let hours = resolved_in.as_seconds_f64() / 3600.0;
            let n = f64::from(self.total_tickets_resolved);
            self.avg_resolution_time =
                (self.avg_resolution_time * n + hours) / (n + 1.0);
            self.total_tickets_resolved += 1;
        }
    }

    pub fn record_rating(&mut self, rating: u8) {
        let n = f64::from(self.rated_tickets);
        self.avg_customer_rating =
            (self.avg_customer_rating * n + f64::from(rating)) / (n + 1.0);
        self.rated_tickets += 1;
    }
}

fn count(row: &Row, column: &'static str) -> Result<u32, Error> {
    u32::try_from(row.try_get::<_, i32>(column)?)
        .map_err(|_| Error::Corrupted(column))
}

impl TryFrom<&Row> for Agent {
    type Error = Error;

    fn try_from(row: &Row) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user: row.try_get("user_id")?,
            skills: row.try_get("skills")?,
            domain_expertise: row.try_get("domain_expertise")?,
            experience: count(row, "experience")?,
            certifications: row.try_get("certifications")?,
            max_tickets: count(row, "max_tickets")?,
            workload: count(row, "workload")?,
            availability: row.try_get("availability")?,
            total_tickets_resolved: count(row, "total_tickets_resolved")?,
            avg_resolution_time: row.try_get("avg_resolution_time")?,
            avg_customer_rating: row.try_get("avg_customer_rating")?,
            rated_tickets: count(row, "rated_tickets")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

uuid_id!(Id);

#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Eq,
    TryFromRepr,
    PartialEq,
    Serialize,
)]
#[repr(u8)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    Online = 1,
    #[default]
    Offline = 2,
    Busy = 3,
}

int2_enum!(Availability, "availability");

impl Client {
    pub async fn write_agent(&self, agent: &Agent) -> Result<(), Error> {
        const SQL: &str = "\
            INSERT INTO agents (id, user_id, skills, domain_expertise, \
                                experience, certifications, max_tickets, \
                                workload, availability, \
                                total_tickets_resolved, avg_resolution_time, \
                                avg_customer_rating, rated_tickets, \
                                created_at) \
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, \
                    $14) \
            ON CONFLICT (id) DO UPDATE \
            SET skills = EXCLUDED.skills, \
                domain_expertise = EXCLUDED.domain_expertise, \
                experience = EXCLUDED.experience, \
                certifications = EXCLUDED.certifications, \
                max_tickets = EXCLUDED.max_tickets, \
                availability = EXCLUDED.availability";

        // Workload and rolling metrics are owned by the statements below.
        self.0
            .execute(
                SQL,
                &[
                    &agent.id,
                    &agent.user,
                    &agent.skills,
                    &agent.domain_expertise,
                    &(agent.experience as i32),
                    &agent.certifications,
                    &(agent.max_tickets as i32),
                    &(agent.workload as i32),
                    &agent.availability,
                    &(agent.total_tickets_resolved as i32),
                    &agent.avg_resolution_time,
                    &agent.avg_customer_rating,
                    &(agent.rated_tickets as i32),
                    &agent.created_at,
                ],
            )
            .await?;
        Ok(())
    }

    pub async fn get_agent_by_id(
        &self,
        id: Id,
    ) -> Result<Option<Agent>, Error> {
        const SQL: &str = "\
            SELECT id, user_id, skills, domain_expertise, experience, \
                   certifications, max_tickets, workload, availability, \
                   total_tickets_resolved, avg_resolution_time, \
                   avg_customer_rating, rated_tickets, created_at \
            FROM agents \
            WHERE id = $1";
        self.0
            .query_opt(SQL, &[&id])
            .await?
            .as_ref()
            .map(Agent::try_from)
            .transpose()
    }

    pub async fn get_agent_by_user(
        &self,
        user: user::Id,
    ) -> Result<Option<Agent>, Error> {
        const SQL: &str = "\
            SELECT id, user_id, skills, domain_expertise, experience, \
                   certifications, max_tickets, workload, availability, \
                   total_tickets_resolved, avg_resolution_time, \
                   avg_customer_rating, rated_tickets, created_at \
            FROM agents \
            WHERE user_id = $1";
        self.0
            .query_opt(SQL, &[&user])
            .await?
            .as_ref()
            .map(Agent::try_from)
            .transpose()
    }

    pub async fn list_agents(&self) -> Result<Vec<Agent>, Error> {
        const SQL: &str = "\
            SELECT id, user_id, skills, domain_expertise, experience, \
                   certifications, max_tickets, workload, availability, \
                   total_tickets_resolved, avg_resolution_time, \
                   avg_customer_rating, rated_tickets, created_at \
            FROM agents \
            ORDER BY created_at, id";
        self.0
            .query(SQL, &[])
            .await?
            .iter()
            .map(Agent::try_from)
            .collect()
    }

    pub async fn assign_ticket(
        &self,
        ticket: &Ticket,
        override_capacity: bool,
    ) -> Result<Option<Agent>, Error> {
        // Reserving the slot and binding the ticket happen in one statement,
        // so concurrent assignments can't both pass the capacity check.
        const SQL: &str = "\
            WITH agent AS ( \
                UPDATE agents \
                SET workload = workload + 1 \
                WHERE id = $1 AND ($2 OR workload < max_tickets) \
                RETURNING id, user_id, skills, domain_expertise, experience, \
                          certifications, max_tickets, workload, \
                          availability, total_tickets_resolved, \
                          avg_resolution_time, avg_customer_rating, \
                          rated_tickets, created_at \
            ), bound AS ( \
                UPDATE tickets \
                SET assigned_to = $1, \
                    status = $3, \
                    history = $4, \
                    updated_at = $5 \
                WHERE id = $6 AND EXISTS (SELECT 1 FROM agent) \
                RETURNING id \
            ) \
            SELECT * FROM agent";

        let Some(agent) = ticket.assigned_to else {
            return Ok(None);
        };
        self.0
            .query_opt(
                SQL,
                &[
                    &agent,
                    &override_capacity,
                    &ticket.status,
                    &ticket::history_json(ticket),
                    &ticket.updated_at,
                    &ticket.id,
                ],
            )
            .await?
            .as_ref()
            .map(Agent::try_from)
            .transpose()
    }

    pub async fn release_agent(
        &self,
        id: Id,
        resolved_in: Option<time::Duration>,
    ) -> Result<(), Error> {
        const SQL: &str = "\
            UPDATE agents \
            SET workload = GREATEST(workload - 1, 0), \
                avg_resolution_time = CASE \
                    WHEN $2::FLOAT8 IS NULL THEN avg_resolution_time \
                    ELSE (avg_resolution_time * total_tickets_resolved + $2) \
                         / (total_tickets_resolved + 1) \
                END, \
                total_tickets_resolved = total_tickets_resolved + CASE \
                    WHEN $2::FLOAT8 IS NULL THEN 0 ELSE 1 \
                END \
            WHERE id = $1";

        let hours = resolved_in.map(|d| d.as_seconds_f64() / 3600.0);
        self.0.execute(SQL, &[&id, &hours]).await?;
        Ok(())
    }

    pub async fn retain_agent(&self, id: Id) -> Result<(), Error> {
        const SQL: &str =
            "UPDATE agents SET workload = workload + 1 WHERE id = $1";
        self.0.execute(SQL, &[&id]).await?;
        Ok(())
    }

    pub async fn record_rating(&self, id: Id, rating: u8) -> Result<(), Error> {
        const SQL: &str = "\
            UPDATE agents \
            SET avg_customer_rating = \
                    (avg_customer_rating * rated_tickets + $2) \
                    / (rated_tickets + 1), \
                rated_tickets = rated_tickets + 1 \
            WHERE id = $1";

        self.0.execute(SQL, &[&id, &f64::from(rating)]).await?;
        Ok(())
    }
}

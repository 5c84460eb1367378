use serde::{Deserialize, Serialize};

use crate::db;

pub use crate::db::agent::{Availability, Id};

use super::user;

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub id: Id,
    pub user: user::Id,
    pub name: String,
    pub email: String,
    pub skills: Vec<String>,
    pub domain_expertise: Vec<String>,
    pub experience: u32,
    pub certifications: Vec<String>,
    pub max_tickets: u32,
    pub workload: u32,
    pub availability: Availability,
    pub total_tickets_resolved: u32,
    pub avg_resolution_time: f64,
    pub avg_customer_rating: f64,
}

impl Agent {
    pub fn new(agent: db::Agent, user: &db::User) -> Self {
        Self {
            id: agent.id,
            user: agent.user,
            name: user.name.clone(),
            email: user.email.clone(),
            skills: agent.skills,
            domain_expertise: agent.domain_expertise,
            experience: agent.experience,
            certifications: agent.certifications,
            max_tickets: agent.max_tickets,
            workload: agent.workload,
            availability: agent.availability,
            total_tickets_resolved: agent.total_tickets_resolved,
            avg_resolution_time: agent.avg_resolution_time,
            avg_customer_rating: agent.avg_customer_rating,
        }
    }
}

/// One row of the admin workload panel.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Workload {
    pub id: Id,
    pub name: String,
    pub active_tickets: u32,
    pub capacity: u32,
    pub availability: Availability,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadList {
    pub agents: Vec<Workload>,
}

/// Outcome of scoring agents for a ticket.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub agent: Id,
    pub score: f64,
}

/// Changes to an agent profile, one at a time.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase",
    tag = "op"
)]
pub enum Edit {
    SetAvailability { availability: Availability },
    SetCapacity { max_tickets: u32 },
    SetSkills {
        skills: Vec<String>,
        #[serde(default)]
        domain_expertise: Vec<String>,
    },
}

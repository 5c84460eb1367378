use std::{net, time};

use serde::Deserialize;

#[derive(Deserialize)]
pub struct Config {
    pub db: Db,
    pub http: Http,
    pub jwt: Jwt,
    #[serde(default)]
    pub sla: Sla,
    #[serde(default)]
    pub agents: Agents,
}

#[derive(Deserialize)]
#[serde(rename_all = "lowercase", tag = "backend")]
pub enum Db {
    Postgres { url: String },

    /// Keeps everything in process memory, lost on restart.
    Memory,
}

#[derive(Deserialize)]
pub struct Http {
    pub server: Server,
    pub cors: Cors,
}

#[derive(Deserialize)]
pub struct Server {
    pub addr: net::SocketAddr,
}

#[derive(Deserialize)]
pub struct Cors {
    pub allowed_origins: Vec<String>,
}

#[derive(Deserialize)]
pub struct Jwt {
    pub secret: String,
    #[serde(with = "humantime_serde")]
    pub expiration_time: time::Duration,
}

/// Resolution windows used to compute a ticket's SLA deadline at creation.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct Sla {
    /// Applies to `high` and `critical` priority tickets.
    #[serde(default = "Sla::default_urgent", with = "humantime_serde")]
    pub urgent: time::Duration,

    /// Applies to everything else.
    #[serde(default = "Sla::default_standard", with = "humantime_serde")]
    pub standard: time::Duration,
}

impl Sla {
    fn default_urgent() -> time::Duration {
        time::Duration::from_secs(72 * 60 * 60)
    }

    fn default_standard() -> time::Duration {
        time::Duration::from_secs(168 * 60 * 60)
    }
}

impl Default for Sla {
    fn default() -> Self {
        Self {
            urgent: Self::default_urgent(),
            standard: Self::default_standard(),
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize)]
pub struct Agents {
    /// Capacity given to agent profiles created at registration.
    #[serde(default = "Agents::default_max_tickets")]
    pub default_max_tickets: u32,
}

impl Agents {
    fn default_max_tickets() -> u32 {
        10
    }
}

impl Default for Agents {
    fn default() -> Self {
        Self {
            default_max_tickets: Self::default_max_tickets(),
        }
    }
}

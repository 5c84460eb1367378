pub mod agent;
pub mod report;
pub mod ticket;
pub mod user;

pub use self::{agent::Agent, ticket::Ticket, user::User};

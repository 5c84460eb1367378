use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::info;

use crate::db::{
    customer,
    user::{self, PasswordHash, Profile, Role},
    Agent, Customer, User,
};

use super::{Error, Tracker};

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,

    /// Only kept for customers.
    #[serde(default)]
    pub organization: Option<String>,
}

impl Tracker {
    /// Creates a user along with the profile their role works through:
    /// customers get a customer profile, agents and admins an agent one.
    pub async fn register(
        &self,
        registration: Registration,
    ) -> Result<User, Error> {
        let Registration {
            name,
            email,
            password,
            role,
            organization,
        } = registration;
        if name.trim().is_empty()
            || email.trim().is_empty()
            || password.is_empty()
        {
            return Err(Error::Validation(
                "name, email and password are required",
            ));
        }

        let now = OffsetDateTime::now_utc();
        let user = User {
            id: user::Id::new(),
            name,
            email: email.trim().to_lowercase(),
            password_hash: PasswordHash::new(&password),
            role,
        };
        let profile = match role {
            Role::Customer => Profile::Customer(Customer {
                id: customer::Id::new(),
                user: user.id,
                organization,
                created_at: now,
            }),
            Role::Agent | Role::Admin => Profile::Agent(Agent::new(
                user.id,
                self.agents.default_max_tickets,
                now,
            )),
        };
        if !self.store.create_user(&user, &profile).await? {
            return Err(Error::Conflict("email is already registered"));
        }

        info!(user = %user.id, role = ?role, "user registered");
        Ok(user)
    }

    pub async fn user(&self, id: user::Id) -> Result<User, Error> {
        self.store
            .get_user_by_id(id)
            .await?
            .ok_or(Error::NotFound(super::Entity::User))
    }

    /// Returns `None` when the email is unknown or the password is wrong.
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<User>, Error> {
        let password_hash = PasswordHash::new(password);
        Ok(self
            .store
            .get_user_by_email(&email.trim().to_lowercase())
            .await?
            .filter(|u| u.password_hash == password_hash))
    }
}

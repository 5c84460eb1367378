use tracing::info;

use crate::{
    api::{self, agent::Edit},
    db::{agent, user::Role, Agent},
};

use super::{Actor, Entity, Error, Tracker};

impl Tracker {
    async fn load_agent(&self, id: agent::Id) -> Result<Agent, Error> {
        self.store
            .get_agent_by_id(id)
            .await?
            .ok_or(Error::NotFound(Entity::Agent))
    }

    async fn profile(&self, agent: Agent) -> Result<api::Agent, Error> {
        let user = self
            .store
            .get_user_by_id(agent.user)
            .await?
            .ok_or(Error::NotFound(Entity::User))?;
        Ok(api::Agent::new(agent, &user))
    }

    /// Staff profiles are visible to staff only.
    pub async fn agent(
        &self,
        actor: &Actor,
        id: agent::Id,
    ) -> Result<api::Agent, Error> {
        if !actor.role.is_staff() {
            return Err(Error::Unauthorized);
        }
        self.profile(self.load_agent(id).await?).await
    }

    /// Admins edit any profile. Agents may set their own availability and
    /// skills, but not their capacity.
    pub async fn edit_agent(
        &self,
        actor: &Actor,
        id: agent::Id,
        edit: Edit,
    ) -> Result<api::Agent, Error> {
        let allowed = match (actor.role, &edit) {
            (Role::Admin, _) => true,
            (Role::Agent, Edit::SetCapacity { .. }) => false,
            (Role::Agent, _) => actor.agent == Some(id),
            (Role::Customer, _) => false,
        };
        if !allowed {
            return Err(Error::Unauthorized);
        }

        let mut agent = self.load_agent(id).await?;
        match edit {
            Edit::SetAvailability { availability } => {
                agent.availability = availability;
            }
            Edit::SetCapacity { max_tickets } => {
                agent.max_tickets = max_tickets;
            }
            Edit::SetSkills {
                skills,
                domain_expertise,
            } => {
                agent.skills = skills;
                agent.domain_expertise = domain_expertise;
            }
        }
        self.store.write_agent(&agent).await?;

        info!(agent = %agent.id, actor = %actor.user, "agent profile edited");
        self.profile(self.load_agent(id).await?).await
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        api::agent::{Availability, Edit},
        db::user::Role,
        tracker::{
            tests::{register, report, tracker},
            Error,
        },
    };

    #[tokio::test]
    async fn agents_edit_own_availability_only() {
        let (tracker, _) = tracker();
        let bob = register(&tracker, "Bob", Role::Agent).await;
        let eve = register(&tracker, "Eve", Role::Agent).await;
        let bob_id = bob.agent.unwrap();

        let edit = Edit::SetAvailability {
            availability: Availability::Busy,
        };
        let err = tracker
            .edit_agent(&eve, bob_id, edit.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unauthorized), "{err}");

        let profile = tracker.edit_agent(&bob, bob_id, edit).await.unwrap();
        assert_eq!(profile.availability, Availability::Busy);
        assert_eq!(profile.name, "Bob");
        assert_eq!(profile.email, "bob@example.com");
    }

    #[tokio::test]
    async fn only_admins_change_capacity() {
        let (tracker, _) = tracker();
        let bob = register(&tracker, "Bob", Role::Agent).await;
        let carol = register(&tracker, "Carol", Role::Admin).await;
        let bob_id = bob.agent.unwrap();

        let edit = Edit::SetCapacity { max_tickets: 3 };
        let err = tracker
            .edit_agent(&bob, bob_id, edit.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unauthorized), "{err}");

        let profile = tracker.edit_agent(&carol, bob_id, edit).await.unwrap();
        assert_eq!(profile.max_tickets, 3);
    }

    #[tokio::test]
    async fn edits_keep_workload() {
        let (tracker, _) = tracker();
        let alice = register(&tracker, "Alice", Role::Customer).await;
        let bob = register(&tracker, "Bob", Role::Agent).await;
        let bob_id = bob.agent.unwrap();
        let ticket = report(&tracker, &alice, "Printer on fire").await;
        tracker.self_assign(&bob, ticket.id).await.unwrap();

        let profile = tracker
            .edit_agent(
                &bob,
                bob_id,
                Edit::SetSkills {
                    skills: vec!["printers".to_owned()],
                    domain_expertise: vec![],
                },
            )
            .await
            .unwrap();

        assert_eq!(profile.skills, ["printers"]);
        assert_eq!(profile.workload, 1);
        let err = tracker.agent(&alice, bob_id).await.unwrap_err();
        assert!(matches!(err, Error::Unauthorized), "{err}");
    }
}

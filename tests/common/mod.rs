use std::sync::Arc;

use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use ticket_desk::{
    api,
    db::memory,
    http::{self, AppState},
    Config,
};

const CONFIG: &str = r#"
[db]
backend = "memory"

[http.server]
addr = "127.0.0.1:0"

[http.cors]
allowed_origins = []

[jwt]
secret = "secret"
expiration_time = "1h"
"#;

/// Serves a fresh in-memory tracker on an ephemeral port and returns its base
/// URL.
pub async fn spawn() -> String {
    let config = toml::from_str::<Config>(CONFIG).expect("invalid config");
    let state = AppState::new(Arc::new(memory::Store::default()), &config);

    let listener = tokio::net::TcpListener::bind(config.http.server.addr)
        .await
        .expect("failed to bind");
    let addr = listener.local_addr().expect("no local address");
    tokio::spawn(async move {
        axum::serve(listener, http::router(state))
            .await
            .expect("server failed");
    });

    format!("http://{addr}")
}

pub struct Client {
    inner: reqwest::Client,
    base_url: String,
    pub auth_token: Option<String>,
}

impl Client {
    pub fn new(base_url: &str) -> Self {
        Self {
            inner: reqwest::Client::new(),
            base_url: base_url.to_owned(),
            auth_token: None,
        }
    }

    /// Registers `name` with the given role and logs in as them.
    pub async fn signed_up(base_url: &str, name: &str, role: &str) -> Self {
        let email = format!("{}@example.com", name.to_lowercase());
        let client = Self::new(base_url);
        client
            .register(name, &email, "password", role)
            .await
            .expect("failed to register");
        client.auth(&email, "password").await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        mut req: RequestBuilder,
    ) -> Result<T, StatusCode> {
        if let Some(token) = &self.auth_token {
            req = req.header("Authorization", format!("Bearer {token}"));
        }
        Ok(req
            .send()
            .await
            .expect("failed to send a request")
            .error_for_status()
            .map_err(|e| e.status().expect("status error"))?
            .json::<T>()
            .await
            .expect("failed to get a response"))
    }

    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        role: &str,
    ) -> Result<api::User, StatusCode> {
        let req = self.inner.post(self.url("/register")).json(&json!({
            "name": name,
            "email": email,
            "password": password,
            "role": role,
        }));
        self.send(req).await
    }

    pub async fn try_auth(
        &self,
        email: &str,
        password: &str,
    ) -> Result<String, StatusCode> {
        Ok(self
            .inner
            .post(self.url("/auth"))
            .json(&json!({
                "email": email,
                "password": password,
            }))
            .send()
            .await
            .expect("failed to send a request")
            .error_for_status()
            .map_err(|e| e.status().expect("status error"))?
            .text()
            .await
            .expect("failed to get a response"))
    }

    pub async fn auth(mut self, email: &str, password: &str) -> Self {
        self.auth_token = Some(
            self.try_auth(email, password)
                .await
                .expect("wrong status code"),
        );
        self
    }

    pub async fn user(&self) -> Result<api::User, StatusCode> {
        self.send(self.inner.get(self.url("/user"))).await
    }

    pub async fn get_tickets(&self) -> Result<api::ticket::List, StatusCode> {
        self.send(self.inner.get(self.url("/tickets"))).await
    }

    pub async fn add_ticket(
        &self,
        ticket: Value,
    ) -> Result<api::Ticket, StatusCode> {
        self.send(self.inner.post(self.url("/tickets")).json(&ticket))
            .await
    }

    pub async fn report(&self, subject: &str) -> api::Ticket {
        self.add_ticket(json!({
            "subject": subject,
            "description": format!("{subject}, details"),
        }))
        .await
        .expect("failed to report a ticket")
    }

    pub async fn get_ticket(
        &self,
        id: api::ticket::Id,
    ) -> Result<api::Ticket, StatusCode> {
        self.send(self.inner.get(self.url(&format!("/tickets/{id}"))))
            .await
    }

    pub async fn update_ticket(
        &self,
        id: api::ticket::Id,
        patch: Value,
    ) -> Result<api::Ticket, StatusCode> {
        let req = self.inner.put(self.url(&format!("/tickets/{id}")));
        self.send(req.json(&patch)).await
    }

    pub async fn delete_ticket(
        &self,
        id: api::ticket::Id,
    ) -> Result<(), StatusCode> {
        let mut req = self.inner.delete(self.url(&format!("/tickets/{id}")));
        if let Some(token) = &self.auth_token {
            req = req.header("Authorization", format!("Bearer {token}"));
        }
        req.send()
            .await
            .expect("failed to send a request")
            .error_for_status()
            .map_err(|e| e.status().expect("status error"))?;
        Ok(())
    }

    pub async fn my_tickets(&self) -> Result<api::ticket::List, StatusCode> {
        self.send(self.inner.get(self.url("/tickets/agent/my-tickets")))
            .await
    }

    pub async fn unassigned_tickets(
        &self,
    ) -> Result<api::ticket::List, StatusCode> {
        self.send(self.inner.get(self.url("/tickets/agent/unassigned")))
            .await
    }

    pub async fn admin_tickets(
        &self,
        query: &[(&str, &str)],
    ) -> Result<api::ticket::List, StatusCode> {
        let req = self.inner.get(self.url("/tickets/admin/tickets"));
        self.send(req.query(query)).await
    }

    pub async fn agents_workload(
        &self,
    ) -> Result<api::agent::WorkloadList, StatusCode> {
        self.send(self.inner.get(self.url("/tickets/admin/agents-workload")))
            .await
    }

    /// Looks up an agent profile id by its user's name.
    pub async fn agent_id(&self, name: &str) -> api::agent::Id {
        self.agents_workload()
            .await
            .expect("failed to list agents")
            .agents
            .into_iter()
            .find(|a| a.name == name)
            .expect("no such agent")
            .id
    }

    pub async fn admin_assign(
        &self,
        id: api::ticket::Id,
        agent: api::agent::Id,
        override_capacity: bool,
    ) -> Result<api::Ticket, StatusCode> {
        let path = format!("/tickets/admin/assign/{id}/{agent}");
        let req = self.inner.post(self.url(&path)).json(&json!({
            "overrideCapacity": override_capacity,
        }));
        self.send(req).await
    }

    /// Admin assignment without a request body.
    pub async fn admin_assign_bare(
        &self,
        id: api::ticket::Id,
        agent: api::agent::Id,
    ) -> Result<api::Ticket, StatusCode> {
        let path = format!("/tickets/admin/assign/{id}/{agent}");
        self.send(self.inner.post(self.url(&path))).await
    }

    pub async fn auto_assign(
        &self,
        id: api::ticket::Id,
    ) -> Result<api::ticket::AutoAssigned, StatusCode> {
        let path = format!("/tickets/admin/auto-assign/{id}");
        self.send(self.inner.post(self.url(&path))).await
    }

    pub async fn bulk_update(
        &self,
        update: Value,
    ) -> Result<api::ticket::List, StatusCode> {
        let req = self.inner.post(self.url("/tickets/admin/bulk-update"));
        self.send(req.json(&update)).await
    }

    pub async fn dashboard(&self) -> Result<api::report::Stats, StatusCode> {
        self.send(self.inner.get(self.url("/tickets/stats/dashboard")))
            .await
    }

    pub async fn aging(&self) -> Result<api::report::Aging, StatusCode> {
        self.send(self.inner.get(self.url("/tickets/stats/aging")))
            .await
    }

    pub async fn assign(
        &self,
        id: api::ticket::Id,
        agent: Option<api::agent::Id>,
    ) -> Result<api::Ticket, StatusCode> {
        let req = self
            .inner
            .post(self.url(&format!("/tickets/{id}/assign")))
            .json(&json!({ "agentId": agent }));
        self.send(req).await
    }

    /// Assignment without a request body.
    pub async fn assign_bare(
        &self,
        id: api::ticket::Id,
    ) -> Result<api::Ticket, StatusCode> {
        let req = self.inner.post(self.url(&format!("/tickets/{id}/assign")));
        self.send(req).await
    }

    pub async fn pickup(
        &self,
        id: api::ticket::Id,
    ) -> Result<api::Ticket, StatusCode> {
        let req = self.inner.post(self.url(&format!("/tickets/{id}/pickup")));
        self.send(req).await
    }

    pub async fn set_status(
        &self,
        id: api::ticket::Id,
        status: &str,
    ) -> Result<api::Ticket, StatusCode> {
        let req = self
            .inner
            .post(self.url(&format!("/tickets/{id}/status")))
            .json(&json!({ "status": status }));
        self.send(req).await
    }

    pub async fn escalate(
        &self,
        id: api::ticket::Id,
        reason: &str,
    ) -> Result<api::Ticket, StatusCode> {
        let req = self
            .inner
            .post(self.url(&format!("/tickets/{id}/escalate")))
            .json(&json!({ "escalationReason": reason }));
        self.send(req).await
    }

    pub async fn comment(
        &self,
        id: api::ticket::Id,
        comment: &str,
    ) -> Result<api::Ticket, StatusCode> {
        let req = self
            .inner
            .post(self.url(&format!("/tickets/{id}/comment")))
            .json(&json!({ "comment": comment }));
        self.send(req).await
    }

    pub async fn feedback(
        &self,
        id: api::ticket::Id,
        rating: u8,
    ) -> Result<api::Ticket, StatusCode> {
        let req = self
            .inner
            .post(self.url(&format!("/tickets/{id}/feedback")))
            .json(&json!({ "rating": rating }));
        self.send(req).await
    }

    pub async fn get_agent(
        &self,
        id: api::agent::Id,
    ) -> Result<api::Agent, StatusCode> {
        self.send(self.inner.get(self.url(&format!("/agents/{id}"))))
            .await
    }

    pub async fn edit_agent(
        &self,
        id: api::agent::Id,
        edit: Value,
    ) -> Result<api::Agent, StatusCode> {
        let req = self.inner.patch(self.url(&format!("/agents/{id}")));
        self.send(req.json(&edit)).await
    }
}

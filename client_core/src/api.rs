//! REST client for the simulation service.

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use sim_proto::{
    decode_agent_detail, decode_agent_list, Agent, AgentDetail, ChatReply, ChatRequest,
    CreateAgentRequest, GenerateAgentsRequest, PresetEvent, SetSpeedRequest, SimulationSpeed,
    SimulationStatus, StepResult, SuccessResponse, TriggerEventRequest,
};
use tracing::{debug, trace};

use crate::error::ClientError;
use crate::store::{Command, CommandReply};

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn status(&self) -> Result<SimulationStatus, ClientError> {
        self.fetch(Method::GET, "/api/simulation/status", None::<&()>)
            .await
    }

    pub async fn start(&self) -> Result<SuccessResponse, ClientError> {
        self.fetch(Method::POST, "/api/simulation/start", None::<&()>)
            .await
    }

    pub async fn stop(&self) -> Result<SuccessResponse, ClientError> {
        self.fetch(Method::POST, "/api/simulation/stop", None::<&()>)
            .await
    }

    pub async fn step(&self) -> Result<StepResult, ClientError> {
        self.fetch(Method::POST, "/api/simulation/step", None::<&()>)
            .await
    }

    pub async fn set_speed(&self, speed: SimulationSpeed) -> Result<SuccessResponse, ClientError> {
        self.fetch(
            Method::PUT,
            "/api/simulation/speed",
            Some(&SetSpeedRequest { speed }),
        )
        .await
    }

    pub async fn list_agents(&self) -> Result<Vec<Agent>, ClientError> {
        let body: Value = self.fetch(Method::GET, "/api/agents", None::<&()>).await?;
        Ok(decode_agent_list(body)?)
    }

    pub async fn agent_detail(&self, agent_id: &str) -> Result<AgentDetail, ClientError> {
        let path = format!("/api/agents/{agent_id}");
        let body: Value = self.fetch(Method::GET, &path, None::<&()>).await?;
        Ok(decode_agent_detail(body)?)
    }

    pub async fn create_agent(
        &self,
        request: &CreateAgentRequest,
    ) -> Result<SuccessResponse, ClientError> {
        self.fetch(Method::POST, "/api/agents", Some(request)).await
    }

    pub async fn generate_agents(&self, count: usize) -> Result<SuccessResponse, ClientError> {
        self.fetch(
            Method::POST,
            "/api/agents/generate",
            Some(&GenerateAgentsRequest { count }),
        )
        .await
    }

    pub async fn trigger_event(&self, event: &PresetEvent) -> Result<SuccessResponse, ClientError> {
        self.fetch(
            Method::POST,
            "/api/interventions/event",
            Some(&TriggerEventRequest {
                event: event.clone(),
            }),
        )
        .await
    }

    pub async fn chat(
        &self,
        agent_id: &str,
        role: &str,
        message: &str,
    ) -> Result<ChatReply, ClientError> {
        let path = format!("/api/agents/{agent_id}/chat");
        let request = ChatRequest {
            role: role.to_string(),
            message: message.to_string(),
        };
        self.fetch(Method::POST, &path, Some(&request)).await
    }

    /// Perform `command` against the service.
    pub async fn execute(&self, command: &Command) -> Result<CommandReply, ClientError> {
        debug!(command = command.name(), "command.sent");
        let reply = match command {
            Command::Start => CommandReply::Ack(self.start().await?),
            Command::Stop => CommandReply::Ack(self.stop().await?),
            Command::Step => CommandReply::Step(self.step().await?),
            Command::SetSpeed(speed) => CommandReply::Ack(self.set_speed(*speed).await?),
            Command::GenerateAgents(count) => {
                CommandReply::Ack(self.generate_agents(*count).await?)
            }
            Command::CreateAgent(request) => CommandReply::Ack(self.create_agent(request).await?),
            Command::TriggerEvent(event) => CommandReply::Ack(self.trigger_event(event).await?),
            Command::Chat {
                agent_id,
                role,
                message,
            } => CommandReply::Chat(self.chat(agent_id, role, message).await?),
            Command::FetchStatus => CommandReply::Status(self.status().await?),
            Command::FetchAgents => CommandReply::Agents(self.list_agents().await?),
            Command::FetchDetail { agent_id, .. } => {
                CommandReply::Detail(self.agent_detail(agent_id).await?)
            }
        };
        Ok(reply)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, format!("{}{}", self.base_url, path))
    }

    async fn fetch<B, T>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut request = self.request(method.clone(), path);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;
        let status = response.status();
        trace!(%method, path, status = status.as_u16(), "http.response");
        if !status.is_success() {
            return Err(ClientError::Status {
                path: path.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.json::<T>().await?)
    }
}

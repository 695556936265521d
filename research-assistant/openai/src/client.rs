use crate::{
    OpenAiConfig, OpenAiError,
    api::{
        AssistantObject, CreateAssistantRequest, CreateMessageRequest, CreateRunRequest,
        ErrorResponse, IdObject, ListResponse, MessageObject, SubmitToolOutputsRequest,
    },
    sse::run_events,
};
use async_trait::async_trait;
use chrono::DateTime;
use reqwest::{Method, RequestBuilder, Response, StatusCode, header::ACCEPT};
use research_assistant::{
    AssistantBackend, AssistantPage, AssistantProfile, AssistantSummary, BackendError,
    ChatMessage, Role, RunEventStream, Tool, ToolCallResult,
};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, error, info};

/// The Assistants API version header value.
const OPENAI_BETA: &str = "assistants=v2";

/// Page size for list endpoints.
const LIST_LIMIT: &str = "100";

/// Client for the OpenAI Assistants API.
pub struct OpenAiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenAiClient {
    /// Create a client from configuration, reading the API key from the configured file.
    pub fn new(config: &OpenAiConfig) -> Result<Self, OpenAiError> {
        let api_key = std::fs::read_to_string(&config.api_key_file)
            .map_err(OpenAiError::ApiKeyRead)?
            .trim()
            .to_string();
        Ok(Self::with_api_key(&config.openai_api_url, api_key))
    }

    pub fn with_api_key(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into(),
        }
    }

    /// Check the API key before any conversation starts.
    ///
    /// Fails with `OpenAiError::Authentication` if the key is rejected.
    pub async fn validate_credentials(&self) -> Result<(), OpenAiError> {
        self.send(self.request(Method::GET, "models")).await?;
        info!("OpenAI credentials accepted");
        Ok(())
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, self.url(path))
            .bearer_auth(&self.api_key)
            .header("OpenAI-Beta", OPENAI_BETA)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, OpenAiError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<ErrorResponse>(&body) {
            Ok(error) => error.error.message,
            Err(_) => body.into(),
        };
        error!("OpenAI API error ({}): {}", status, message);
        if status == StatusCode::UNAUTHORIZED {
            Err(OpenAiError::Authentication(message))
        } else {
            Err(OpenAiError::ApiError(message))
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, OpenAiError> {
        let response = self
            .send(self.request(Method::GET, path).query(query))
            .await?;
        Ok(response.json().await?)
    }

    async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, OpenAiError> {
        let response = self
            .send(self.request(Method::POST, path).json(body))
            .await?;
        Ok(response.json().await?)
    }

    async fn post_stream<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<RunEventStream, OpenAiError> {
        let request = self
            .request(Method::POST, path)
            .header(ACCEPT, "text/event-stream")
            .json(body);
        let response = self.send(request).await?;
        Ok(run_events(response.bytes_stream()))
    }
}

#[async_trait]
impl AssistantBackend for OpenAiClient {
    async fn list_assistants(&self, cursor: Option<&str>) -> Result<AssistantPage, BackendError> {
        let mut query = vec![("limit", LIST_LIMIT)];
        if let Some(after) = cursor {
            query.push(("after", after));
        }
        let page: ListResponse<AssistantObject> = self.get_json("assistants", &query).await?;
        debug!("Listed {} assistants (has_more={})", page.data.len(), page.has_more);

        let next_cursor = if page.has_more { page.last_id } else { None };
        Ok(AssistantPage {
            assistants: page
                .data
                .into_iter()
                .map(|a| AssistantSummary {
                    id: a.id,
                    name: a.name,
                })
                .collect(),
            next_cursor,
        })
    }

    async fn create_assistant(
        &self,
        profile: &AssistantProfile,
        tools: &[Tool],
    ) -> Result<String, BackendError> {
        let request = CreateAssistantRequest {
            name: &profile.name,
            instructions: &profile.instructions,
            model: &profile.model,
            tools: tools.iter().map(Into::into).collect(),
        };
        let assistant: IdObject = self.post_json("assistants", &request).await?;
        Ok(assistant.id)
    }

    async fn create_thread(&self) -> Result<String, BackendError> {
        let thread: IdObject = self
            .post_json("threads", &serde_json::json!({}))
            .await?;
        Ok(thread.id)
    }

    async fn add_user_message(&self, thread_id: &str, text: &str) -> Result<(), BackendError> {
        let request = CreateMessageRequest {
            role: Role::User.api_role(),
            content: text,
        };
        let message: IdObject = self
            .post_json(&format!("threads/{thread_id}/messages"), &request)
            .await?;
        debug!("Added message {} to thread {}", message.id, thread_id);
        Ok(())
    }

    async fn list_messages(&self, thread_id: &str) -> Result<Vec<ChatMessage>, BackendError> {
        let path = format!("threads/{thread_id}/messages");
        let mut messages = Vec::new();
        let mut after: Option<String> = None;

        loop {
            let mut query = vec![("limit", LIST_LIMIT), ("order", "asc")];
            if let Some(cursor) = &after {
                query.push(("after", cursor.as_str()));
            }
            let page: ListResponse<MessageObject> = self.get_json(&path, &query).await?;

            messages.extend(page.data.iter().map(|message| ChatMessage {
                role: Role::from_api_role(&message.role),
                timestamp: DateTime::from_timestamp(message.created_at, 0).unwrap_or_default(),
                text: message.text().into(),
            }));

            match page.last_id {
                Some(last_id) if page.has_more => after = Some(last_id),
                _ => break,
            }
        }

        Ok(messages)
    }

    async fn start_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
    ) -> Result<RunEventStream, BackendError> {
        let request = CreateRunRequest {
            assistant_id,
            stream: true,
        };
        info!("Starting run of {} on thread {}", assistant_id, thread_id);
        Ok(self
            .post_stream(&format!("threads/{thread_id}/runs"), &request)
            .await?)
    }

    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: &[ToolCallResult],
    ) -> Result<RunEventStream, BackendError> {
        let request = SubmitToolOutputsRequest {
            tool_outputs: outputs.iter().map(Into::into).collect(),
            stream: true,
        };
        Ok(self
            .post_stream(
                &format!("threads/{thread_id}/runs/{run_id}/submit_tool_outputs"),
                &request,
            )
            .await?)
    }

    async fn cancel_run(&self, thread_id: &str, run_id: &str) -> Result<(), BackendError> {
        let _: IdObject = self
            .post_json(
                &format!("threads/{thread_id}/runs/{run_id}/cancel"),
                &serde_json::json!({}),
            )
            .await?;
        info!("Cancelled run {}", run_id);
        Ok(())
    }
}

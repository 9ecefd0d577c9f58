use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use rowscribe_core::{ColumnDescriptor, Error, Result, StatementSet};

use super::{Conversion, IdentifierConverter, conversion_prompt, parse_insert_statements};

/// Connection details of the chat-completion translation service.
#[derive(Debug, Clone)]
pub struct ChatServiceConfig {
    pub api_url: String,
    pub api_key: String,
    pub user: String,
    pub timeout: Duration,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    inputs: Value,
    query: &'a str,
    response_mode: &'static str,
    conversation_id: &'static str,
    user: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    answer: String,
}

/// Verdict of the service on a batch of statements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub answer: String,
    pub validated_count: usize,
}

/// `IdentifierConverter` backed by a blocking-mode chat endpoint.
pub struct ChatServiceConverter {
    client: Client,
    config: ChatServiceConfig,
}

impl ChatServiceConverter {
    pub fn new(config: ChatServiceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| Error::ConversionFailed(format!("http client: {err}")))?;
        Ok(Self { client, config })
    }

    pub fn with_client(config: ChatServiceConfig, client: Client) -> Self {
        Self { client, config }
    }

    /// Ask the service to check statements against the column layout.
    pub async fn verify(&self, input: &str, validated_count: usize) -> Result<Verification> {
        let answer = self.ask(json!({ "type": "verify" }), input).await?;
        info!(statements = validated_count, "sql verification completed");
        Ok(Verification {
            answer,
            validated_count,
        })
    }

    async fn ask(&self, inputs: Value, query: &str) -> Result<String> {
        let body = ChatRequest {
            inputs,
            query,
            response_mode: "blocking",
            conversation_id: "",
            user: &self.config.user,
        };
        debug!(url = %self.config.api_url, query_len = query.len(), "calling chat service");

        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| Error::ConversionFailed(format!("request failed: {err}")))?
            .error_for_status()
            .map_err(|err| Error::ConversionFailed(format!("service error: {err}")))?;
        let payload: ChatResponse = response
            .json()
            .await
            .map_err(|err| Error::ConversionFailed(format!("malformed response: {err}")))?;

        if payload.answer.trim().is_empty() {
            return Err(Error::ConversionFailed("service returned an empty answer".to_string()));
        }
        Ok(payload.answer)
    }
}

#[async_trait]
impl IdentifierConverter for ChatServiceConverter {
    fn name(&self) -> &'static str {
        "chat_service"
    }

    async fn convert(
        &self,
        statements: &StatementSet,
        source_id: &str,
        target_id: &str,
    ) -> Result<Conversion> {
        let prompt = conversion_prompt(source_id, target_id, statements);
        info!(
            source_id,
            target_id,
            statements = statements.len(),
            "identifier conversion requested"
        );
        let answer = self.ask(json!({}), &prompt).await?;

        let converted = parse_insert_statements(&answer);
        if converted.is_empty() {
            warn!(answer_len = answer.len(), "no INSERT statement in conversion answer");
            return Err(Error::ConversionFailed(
                "answer contained no INSERT statement".to_string(),
            ));
        }
        info!(
            original = statements.len(),
            converted = converted.len(),
            "identifier conversion completed"
        );
        Ok(Conversion {
            statements: converted,
            raw_response: answer,
        })
    }
}

/// Verification request text: column names, column types, then the statements.
pub fn verification_input(columns: &[ColumnDescriptor], statements: &[String]) -> String {
    let mut lines = Vec::with_capacity(statements.len() + 2);
    if !columns.is_empty() {
        lines.push(
            columns
                .iter()
                .map(|column| column.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        );
        lines.push(
            columns
                .iter()
                .map(|column| column.sql_type.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        );
    }
    lines.extend(statements.iter().cloned());
    lines.join("\n")
}

// SPDX-FileCopyrightText: 2026 Ringlet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ranking oracle composition.
//!
//! [`TieredRanker`] tries each configured oracle in order and keeps the
//! first non-empty ranked list. [`ModelRanker`] is the tier-2 oracle: a
//! direct reasoning-model call that scores completed call results when the
//! flow engine's ranking flow is unavailable or returns nothing usable.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use ringlet_config::model::RankerConfig;
use ringlet_core::types::{CallResult, RankedProvider, ServiceRequest};
use ringlet_core::{RankingOracle, RingletError};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Tries each oracle in order; the first non-empty list wins.
pub struct TieredRanker {
    tiers: Vec<Arc<dyn RankingOracle>>,
}

impl TieredRanker {
    pub fn new(tiers: Vec<Arc<dyn RankingOracle>>) -> Self {
        Self { tiers }
    }
}

#[async_trait]
impl RankingOracle for TieredRanker {
    fn name(&self) -> &str {
        "tiered"
    }

    async fn rank(
        &self,
        request: &ServiceRequest,
        results: &[CallResult],
    ) -> Result<Vec<RankedProvider>, RingletError> {
        for tier in &self.tiers {
            match tier.rank(request, results).await {
                Ok(ranked) if !ranked.is_empty() => {
                    debug!(
                        request_id = request.id,
                        tier = tier.name(),
                        count = ranked.len(),
                        "ranking tier produced recommendations"
                    );
                    return Ok(ranked);
                }
                Ok(_) => {
                    warn!(request_id = request.id, tier = tier.name(), "ranking tier returned empty list");
                }
                Err(e) => {
                    warn!(request_id = request.id, tier = tier.name(), error = %e, "ranking tier failed");
                }
            }
        }
        Err(RingletError::Internal(
            "no ranking oracle produced recommendations".to_string(),
        ))
    }
}

// --- Tier-2: direct reasoning oracle ---

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: Option<String>,
}

/// First ~400 characters of a transcript, respecting char boundaries.
fn excerpt(text: &str) -> &str {
    text.char_indices()
        .nth(400)
        .map(|(i, _)| &text[..i])
        .unwrap_or(text)
}

/// Direct reasoning-model ranking oracle.
pub struct ModelRanker {
    client: reqwest::Client,
    base_url: String,
    model: String,
    max_tokens: u32,
}

impl ModelRanker {
    pub fn new(config: &RankerConfig) -> Result<Self, RingletError> {
        let mut headers = HeaderMap::new();
        if let Some(ref api_key) = config.api_key {
            let value = HeaderValue::from_str(api_key).map_err(|e| {
                RingletError::Config(format!("invalid ranker API key header value: {e}"))
            })?;
            headers.insert("x-api-key", value);
        }
        headers.insert("anthropic-version", HeaderValue::from_static("2023-06-01"));
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| RingletError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        })
    }

    /// Builds the ranking prompt from the request context and call outcomes.
    fn build_prompt(request: &ServiceRequest, results: &[CallResult]) -> String {
        let mut prompt = format!(
            "You are ranking service providers for a customer request.\n\
             Service: {}\nProblem: {}\nUrgency: {}\nAddress: {}\n\nCall outcomes:\n",
            request.service_type, request.description, request.urgency, request.address
        );
        for result in results {
            prompt.push_str(&format!(
                "- {} ({}): status={}, summary={}, transcript excerpt: {}\n",
                result.provider_name,
                result.phone,
                result.status,
                result
                    .analysis
                    .as_ref()
                    .and_then(|a| a.summary.as_deref())
                    .unwrap_or("none"),
                result.transcript.as_deref().map(excerpt).unwrap_or("none"),
            ));
        }
        prompt.push_str(
            "\nRank the providers that answered and could help, best first. \
             Respond with ONLY a JSON array of objects with fields: rank, \
             provider_name, phone, provider_id, reason, estimate.",
        );
        prompt
    }

    /// Extracts the JSON array from the model's free-text reply.
    fn parse_recommendations(text: &str) -> Result<Vec<RankedProvider>, RingletError> {
        let start = text.find('[');
        let end = text.rfind(']');
        let (Some(start), Some(end)) = (start, end) else {
            return Err(RingletError::Internal(
                "ranking response contained no JSON array".to_string(),
            ));
        };
        if end < start {
            return Err(RingletError::Internal(
                "ranking response contained malformed JSON".to_string(),
            ));
        }
        serde_json::from_str(&text[start..=end])
            .map_err(|e| RingletError::Internal(format!("invalid ranking JSON: {e}")))
    }
}

#[async_trait]
impl RankingOracle for ModelRanker {
    fn name(&self) -> &str {
        "model"
    }

    async fn rank(
        &self,
        request: &ServiceRequest,
        results: &[CallResult],
    ) -> Result<Vec<RankedProvider>, RingletError> {
        let url = format!("{}/v1/messages", self.base_url);
        let body = MessagesRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            messages: vec![Message {
                role: "user",
                content: Self::build_prompt(request, results),
            }],
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RingletError::Internal(format!("ranking request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RingletError::Internal(format!(
                "ranking oracle returned {status}: {body}"
            )));
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| RingletError::Internal(format!("invalid ranking response: {e}")))?;
        let text = parsed
            .content
            .iter()
            .filter(|b| b.block_type == "text")
            .filter_map(|b| b.text.as_deref())
            .collect::<Vec<_>>()
            .join("");

        Self::parse_recommendations(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ringlet_core::types::{LifecycleState, Urgency};
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn service_request() -> ServiceRequest {
        ServiceRequest {
            id: "req-1".to_string(),
            service_type: "plumbing".to_string(),
            description: "leaking sink".to_string(),
            urgency: Urgency::Normal,
            address: "12 Canal St".to_string(),
            state: LifecycleState::Analyzing,
            selected_provider: None,
            recommendations: None,
            outcome: None,
            appointment_date: None,
            appointment_time: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    struct FixedRanker {
        name: &'static str,
        response: Result<Vec<RankedProvider>, String>,
    }

    #[async_trait]
    impl RankingOracle for FixedRanker {
        fn name(&self) -> &str {
            self.name
        }

        async fn rank(
            &self,
            _request: &ServiceRequest,
            _results: &[CallResult],
        ) -> Result<Vec<RankedProvider>, RingletError> {
            match &self.response {
                Ok(list) => Ok(list.clone()),
                Err(message) => Err(RingletError::Internal(message.clone())),
            }
        }
    }

    fn ranked(name: &str) -> RankedProvider {
        RankedProvider {
            rank: 1,
            provider_name: name.to_string(),
            phone: "+15550000001".to_string(),
            provider_id: None,
            reason: "available".to_string(),
            estimate: None,
        }
    }

    #[tokio::test]
    async fn tiered_ranker_skips_failed_and_empty_tiers() {
        let ranker = TieredRanker::new(vec![
            Arc::new(FixedRanker {
                name: "flow",
                response: Err("engine down".to_string()),
            }),
            Arc::new(FixedRanker {
                name: "empty",
                response: Ok(vec![]),
            }),
            Arc::new(FixedRanker {
                name: "model",
                response: Ok(vec![ranked("Apex Plumbing")]),
            }),
        ]);

        let result = ranker.rank(&service_request(), &[]).await.unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].provider_name, "Apex Plumbing");
    }

    #[tokio::test]
    async fn tiered_ranker_fails_when_all_tiers_fail() {
        let ranker = TieredRanker::new(vec![Arc::new(FixedRanker {
            name: "flow",
            response: Ok(vec![]),
        })]);

        let err = ranker.rank(&service_request(), &[]).await.expect_err("must fail");
        assert!(format!("{err}").contains("no ranking oracle"));
    }

    #[tokio::test]
    async fn model_ranker_parses_json_array_from_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [{
                    "type": "text",
                    "text": "Here is the ranking:\n[{\"rank\": 1, \"provider_name\": \"Apex Plumbing\", \"phone\": \"+15550000001\", \"reason\": \"available today\"}]"
                }]
            })))
            .mount(&server)
            .await;

        let ranker = ModelRanker::new(&RankerConfig {
            base_url: server.uri(),
            api_key: Some("sk-test".to_string()),
            ..Default::default()
        })
        .unwrap();

        let result = ranker.rank(&service_request(), &[]).await.unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].provider_name, "Apex Plumbing");
    }

    #[tokio::test]
    async fn model_ranker_rejects_reply_without_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [{"type": "text", "text": "I could not rank these providers."}]
            })))
            .mount(&server)
            .await;

        let ranker = ModelRanker::new(&RankerConfig {
            base_url: server.uri(),
            ..Default::default()
        })
        .unwrap();

        let err = ranker.rank(&service_request(), &[]).await.expect_err("must fail");
        assert!(format!("{err}").contains("no JSON array"));
    }
}

//! Concurrent push dispatch.
//!
//! One outbound request per recipient, fanned out as independent tasks and
//! joined before returning. A recipient's failure is recorded in its own
//! outcome and never cancels or contaminates sibling sends.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Semaphore;
use uuid::Uuid;

use courier_common::config::AppConfig;
use courier_common::error::AppError;
use courier_common::types::{AccessToken, DispatchOutcome, Recipient};

use crate::builder::PushMessage;

/// Request envelope expected by the gateway's v1 send endpoint.
#[derive(Debug, Serialize)]
struct SendEnvelope<'a> {
    message: &'a PushMessage,
}

/// Sends a batch of messages to the push gateway, one request per recipient.
pub struct Dispatcher {
    http: reqwest::Client,
    endpoint: String,
    project_id: String,
    max_in_flight: usize,
}

impl Dispatcher {
    pub fn new(
        endpoint: &str,
        project_id: &str,
        timeout: Duration,
        max_in_flight: usize,
    ) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            project_id: project_id.to_string(),
            max_in_flight: max_in_flight.max(1),
        })
    }

    pub fn from_config(config: &AppConfig, project_id: &str) -> Result<Self, AppError> {
        Self::new(
            &config.fcm_endpoint,
            project_id,
            Duration::from_secs(config.send_timeout_secs),
            config.max_concurrent_sends,
        )
    }

    /// Send every message concurrently and wait for all of them to resolve.
    ///
    /// Returns one outcome per input message; outcome order follows the
    /// input batch and carries no meaning.
    pub async fn send_all(
        &self,
        token: &AccessToken,
        batch: Vec<(Recipient, PushMessage)>,
    ) -> Vec<DispatchOutcome> {
        let url = format!(
            "{}/v1/projects/{}/messages:send",
            self.endpoint, self.project_id
        );
        let limiter = Arc::new(Semaphore::new(self.max_in_flight));

        let mut tasks = Vec::with_capacity(batch.len());
        for (recipient, message) in batch {
            let http = self.http.clone();
            let url = url.clone();
            let bearer = token.as_str().to_string();
            let limiter = Arc::clone(&limiter);

            let recipient_id = recipient.id;
            let handle = tokio::spawn(async move {
                let _permit = match limiter.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return DispatchOutcome {
                            recipient_id,
                            success: false,
                            error: Some("dispatch aborted before send".to_string()),
                        };
                    }
                };
                send_one(&http, &url, &bearer, recipient_id, &message).await
            });
            tasks.push((recipient_id, handle));
        }

        let mut outcomes = Vec::with_capacity(tasks.len());
        for (recipient_id, handle) in tasks {
            match handle.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    tracing::error!(%recipient_id, error = %e, "Send task aborted");
                    outcomes.push(DispatchOutcome {
                        recipient_id,
                        success: false,
                        error: Some(format!("send task aborted: {e}")),
                    });
                }
            }
        }

        outcomes
    }
}

async fn send_one(
    http: &reqwest::Client,
    url: &str,
    bearer: &str,
    recipient_id: Uuid,
    message: &PushMessage,
) -> DispatchOutcome {
    let result = http
        .post(url)
        .bearer_auth(bearer)
        .json(&SendEnvelope { message })
        .send()
        .await;

    match result {
        // A 2xx means the gateway accepted the message; the response body is
        // not part of the contract and is not parsed.
        Ok(response) if response.status().is_success() => DispatchOutcome {
            recipient_id,
            success: true,
            error: None,
        },
        Ok(response) => {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            tracing::warn!(%recipient_id, %status, "Push gateway rejected send");
            DispatchOutcome {
                recipient_id,
                success: false,
                error: Some(format!("gateway returned {status}: {detail}")),
            }
        }
        Err(e) => {
            tracing::warn!(%recipient_id, error = %e, "Push send failed");
            DispatchOutcome {
                recipient_id,
                success: false,
                error: Some(e.to_string()),
            }
        }
    }
}

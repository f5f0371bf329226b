//! Long-running-job client for Azure AI Language extractive summarisation.
//!
//! One call drives one job through submit → poll → extract. Polling is
//! sequential: the next GET is only issued after the previous response has
//! been read.

use crate::credentials::Credentials;
use crate::error::{ApiError, Phase, SummarizeError};
use crate::summary::{SummaryRequest, SummaryResult};
use crate::wire::{self, AnalyzeJobBody, JobStatus};
use reqwest::{Client, Response};
use serde_json::Value;
use std::time::Duration;

/// API version of the analyze-text jobs endpoint
pub const API_VERSION: &str = "2023-04-01";

/// Header carrying the subscription key
pub const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// Header pointing at the job status resource
pub const OPERATION_LOCATION_HEADER: &str = "operation-location";

/// Default timeout for each HTTP request
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = concat!("docsumma/", env!("CARGO_PKG_VERSION"));

/// Fixed-interval retry policy for the poll loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            delay: Duration::from_millis(1000),
        }
    }
}

/// Where to poll for one submitted job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle(String);

impl JobHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Client for the analyze-text jobs API.
///
/// Submits one extractive summarisation job per call and polls its
/// operation-location under the configured [`PollPolicy`].
///
/// ```no_run
/// use docsumma::{Credentials, JobClient, PollPolicy, SummaryLength, SummaryRequest};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let client = JobClient::new(PollPolicy::default())?;
/// let credentials = Credentials::new("https://example.cognitiveservices.azure.com", "key")?;
/// let request = SummaryRequest::new("Some long text to summarise.", SummaryLength::Short)?;
/// let summary = client.summarize(&request, &credentials).await?;
/// println!("{}", summary.text());
/// # Ok(())
/// # }
/// ```
pub struct JobClient {
    http: Client,
    policy: PollPolicy,
}

impl JobClient {
    /// Create a client with the default 30 second request timeout
    pub fn new(policy: PollPolicy) -> Result<Self, SummarizeError> {
        Self::with_timeout(policy, REQUEST_TIMEOUT)
    }

    /// Create a client whose HTTP requests give up after `timeout`.
    ///
    /// The timeout applies to each submit and poll request on its own, not to
    /// the whole job.
    pub fn with_timeout(policy: PollPolicy, timeout: Duration) -> Result<Self, SummarizeError> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| SummarizeError::NetworkUnavailable(e.to_string()))?;
        Ok(Self::from_client(http, policy))
    }

    /// Use an existing reqwest client
    pub fn from_client(http: Client, policy: PollPolicy) -> Self {
        Self { http, policy }
    }

    /// Attempt budget and delay used when polling a job
    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    /// Submit the request, wait for the job to finish and return its sentences
    #[tracing::instrument(
        skip(self, request, credentials),
        fields(
            endpoint = %credentials.endpoint,
            sentence_count = request.sentence_count(),
            chars = request.document_text().len()
        )
    )]
    pub async fn summarize(
        &self,
        request: &SummaryRequest,
        credentials: &Credentials,
    ) -> Result<SummaryResult, SummarizeError> {
        let handle = self.submit(request, credentials).await?;
        let body = self.poll(&handle, credentials).await?;
        let sentences = wire::extract_sentences(&body)?;

        let result = SummaryResult::new(sentences);
        if result.is_empty() {
            return Err(SummarizeError::ResultFormat(
                "summary text is empty".to_string(),
            ));
        }

        tracing::info!(sentences = result.sentences.len(), "summary received");
        Ok(result)
    }

    async fn submit(
        &self,
        request: &SummaryRequest,
        credentials: &Credentials,
    ) -> Result<JobHandle, SummarizeError> {
        let url = format!(
            "{}/language/analyze-text/jobs?api-version={}",
            credentials.endpoint.trim_end_matches('/'),
            API_VERSION
        );

        let response = self
            .http
            .post(&url)
            .header(SUBSCRIPTION_KEY_HEADER, &credentials.api_key)
            .json(&AnalyzeJobBody::from_request(request))
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status();
        if !status.is_success() {
            let message = read_error_message(response).await;
            tracing::warn!(status = status.as_u16(), ?message, "job submission rejected");
            return Err(SummarizeError::SubmitHttp(ApiError::new(
                status.as_u16(),
                message,
                Phase::Submit,
            )));
        }

        let location = response
            .headers()
            .get(OPERATION_LOCATION_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.trim().is_empty())
            .ok_or(SummarizeError::MissingOperationLocation)?
            .to_string();

        tracing::debug!(operation_location = %location, "job submitted");
        Ok(JobHandle(location))
    }

    async fn poll(
        &self,
        handle: &JobHandle,
        credentials: &Credentials,
    ) -> Result<Value, SummarizeError> {
        let max_attempts = self.policy.max_attempts;

        for attempt in 1..=max_attempts {
            let response = self
                .http
                .get(handle.as_str())
                .header(SUBSCRIPTION_KEY_HEADER, &credentials.api_key)
                .send()
                .await
                .map_err(network_error)?;

            let status = response.status();
            if !status.is_success() {
                let message = read_error_message(response).await;
                tracing::warn!(attempt, status = status.as_u16(), "polling rejected");
                return Err(SummarizeError::PollHttp(ApiError::new(
                    status.as_u16(),
                    message,
                    Phase::Poll,
                )));
            }

            let body: Value = response.json().await.map_err(|e| {
                if e.is_decode() {
                    SummarizeError::ResultFormat(format!("poll body is not JSON: {e}"))
                } else {
                    network_error(e)
                }
            })?;

            match wire::job_status(&body)? {
                JobStatus::Succeeded => {
                    tracing::debug!(attempt, "job succeeded");
                    return Ok(body);
                }
                JobStatus::Failed => {
                    let message = wire::job_error_message(&body);
                    tracing::warn!(attempt, ?message, "job failed");
                    return Err(SummarizeError::ServiceAnalysisFailed(message));
                }
                JobStatus::Running => {
                    tracing::debug!(attempt, max_attempts, "job still running");
                    if attempt < max_attempts {
                        tokio::time::sleep(self.policy.delay).await;
                    }
                }
            }
        }

        Err(SummarizeError::PollTimeout {
            attempts: max_attempts,
        })
    }
}

/// `error.message` from an error response body, if it has one
async fn read_error_message(response: Response) -> Option<String> {
    let body = response.json::<Value>().await.ok()?;
    wire::error_message(&body)
}

fn network_error(e: reqwest::Error) -> SummarizeError {
    SummarizeError::NetworkUnavailable(e.to_string())
}

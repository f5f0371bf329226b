//! Application controller: ties input, extraction, credentials and the job
//! client together and turns failures into messages for the user.

use crate::client::JobClient;
use crate::config::{Config, ConfigError};
use crate::credentials::{CredentialError, CredentialStore, Credentials, SledCredentialStore};
use crate::error::{ErrorClass, SummarizeError};
use crate::extract::{ExtractError, FileInfo, FileTextExtractor};
use crate::summary::{RequestError, SummaryLength, SummaryRequest, SummaryResult};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ControllerError {
    #[error("a summary is already being processed")]
    Busy,
    #[error("no endpoint or API key configured")]
    MissingCredentials,
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error(transparent)]
    Summarize(#[from] SummarizeError),
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error(transparent)]
    Credentials(#[from] CredentialError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ControllerError {
    pub fn class(&self) -> ErrorClass {
        match self {
            ControllerError::Summarize(e) => e.class(),
            _ => ErrorClass::Other,
        }
    }

    /// Text to show the user for this failure
    pub fn user_message(&self) -> String {
        match self.class() {
            ErrorClass::Authentication => {
                "Invalid credentials. Please check your API key and endpoint.".to_string()
            }
            ErrorClass::RateLimited => "Rate limit exceeded. Please try again later.".to_string(),
            ErrorClass::Other => self.detail_message(),
        }
    }

    fn detail_message(&self) -> String {
        match self {
            ControllerError::Busy => {
                "A summary is already being processed, please wait for it to finish.".to_string()
            }
            ControllerError::MissingCredentials => {
                "Please enter your endpoint and API key first (docsumma credentials set)."
                    .to_string()
            }
            ControllerError::Request(RequestError::EmptyDocument) => {
                "Please enter some text to summarise.".to_string()
            }
            ControllerError::Extract(e) => format!(
                "Error processing file: {e}. Please try again or use a different file."
            ),
            other => format!("Operation failed: {other}"),
        }
    }
}

/// Result of summarising a file
#[derive(Debug, Clone)]
pub struct FileSummary {
    pub file: FileInfo,
    pub characters: usize,
    pub summary: SummaryResult,
}

/// Marks a request as in flight until dropped
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct Controller {
    config: Config,
    client: JobClient,
    store: Box<dyn CredentialStore>,
    extractor: FileTextExtractor,
    in_flight: AtomicBool,
}

impl Controller {
    pub fn new(
        config: Config,
        client: JobClient,
        store: Box<dyn CredentialStore>,
        extractor: FileTextExtractor,
    ) -> Self {
        Self {
            config,
            client,
            store,
            extractor,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Build a controller with a sled credential store under the configured path
    pub fn from_config(config: Config) -> Result<Self, ControllerError> {
        let client = JobClient::with_timeout(config.poll_policy(), config.request_timeout())?;
        std::fs::create_dir_all(&config.storage.path).map_err(ConfigError::ReadError)?;
        let store = SledCredentialStore::open(config.credentials_path())?;
        Ok(Self::new(
            config,
            client,
            Box::new(store),
            FileTextExtractor::default(),
        ))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Environment credentials win over stored ones
    pub fn credentials(&self) -> Result<Credentials, ControllerError> {
        if let Some(credentials) = self.config.env_credentials() {
            return Ok(credentials);
        }
        self.store.get()?.ok_or(ControllerError::MissingCredentials)
    }

    pub fn stored_credentials(&self) -> Result<Option<Credentials>, ControllerError> {
        Ok(self.store.get()?)
    }

    pub fn save_credentials(
        &self,
        endpoint: &str,
        api_key: &str,
    ) -> Result<Credentials, ControllerError> {
        let credentials = Credentials::new(endpoint, api_key)?;
        self.store.set(&credentials)?;
        tracing::info!(endpoint = %credentials.endpoint, "credentials saved");
        Ok(credentials)
    }

    /// Summarise pasted or piped text
    pub async fn summarize_text(
        &self,
        text: &str,
        length: SummaryLength,
    ) -> Result<SummaryResult, ControllerError> {
        let _guard = InFlight::acquire(&self.in_flight).ok_or(ControllerError::Busy)?;
        self.run(text, length).await
    }

    /// Extract a file's text and summarise it
    pub async fn summarize_file(
        &self,
        path: &Path,
        mime: Option<&str>,
        length: SummaryLength,
    ) -> Result<FileSummary, ControllerError> {
        let _guard = InFlight::acquire(&self.in_flight).ok_or(ControllerError::Busy)?;

        let file = self.extractor.inspect(path, mime)?;
        let extractor = self.extractor.clone();
        let owned_path = path.to_path_buf();
        let owned_mime = mime.map(str::to_string);
        let text = tokio::task::spawn_blocking(move || {
            extractor.extract(&owned_path, owned_mime.as_deref())
        })
        .await
        .map_err(|e| ExtractError::ExtractionFailed(format!("task join error: {e}")))??;

        tracing::info!(
            file = %path.display(),
            kind = file.media_type.label(),
            bytes = file.size,
            characters = text.len(),
            "file text extracted"
        );

        let summary = self.run(&text, length).await?;
        Ok(FileSummary {
            file,
            characters: text.len(),
            summary,
        })
    }

    async fn run(&self, text: &str, length: SummaryLength) -> Result<SummaryResult, ControllerError> {
        let credentials = self.credentials()?;
        let request =
            SummaryRequest::new(text, length)?.with_language(self.config.service.language.clone());

        match self.client.summarize(&request, &credentials).await {
            Ok(summary) => Ok(summary),
            Err(e) => {
                tracing::error!(error = %e, class = ?e.class(), "summarisation failed");
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::PollPolicy;
    use crate::credentials::MemoryCredentialStore;
    use crate::error::{ApiError, Phase};

    fn controller(store: MemoryCredentialStore) -> Controller {
        Controller::new(
            Config::default(),
            JobClient::new(PollPolicy::default()).unwrap(),
            Box::new(store),
            FileTextExtractor::default(),
        )
    }

    #[test]
    fn in_flight_guard_is_exclusive_and_released() {
        let flag = AtomicBool::new(false);
        {
            let _guard = InFlight::acquire(&flag).unwrap();
            assert!(InFlight::acquire(&flag).is_none());
        }
        assert!(!flag.load(Ordering::Acquire));
        assert!(InFlight::acquire(&flag).is_some());
    }

    #[test]
    fn distinct_messages_per_error_class() {
        let auth = ControllerError::Summarize(SummarizeError::SubmitHttp(ApiError::new(
            401,
            None,
            Phase::Submit,
        )));
        let limited = ControllerError::Summarize(SummarizeError::SubmitHttp(ApiError::new(
            429,
            None,
            Phase::Submit,
        )));
        let server = ControllerError::Summarize(SummarizeError::SubmitHttp(ApiError::new(
            500,
            Some("Internal error".into()),
            Phase::Submit,
        )));

        assert!(auth.user_message().starts_with("Invalid credentials"));
        assert!(limited.user_message().starts_with("Rate limit exceeded"));
        assert_eq!(
            server.user_message(),
            "Operation failed: submit request failed with status 500: Internal error"
        );
    }

    #[tokio::test]
    async fn missing_credentials_short_circuit() {
        let controller = controller(MemoryCredentialStore::new());
        let err = controller
            .summarize_text("Some text.", SummaryLength::Short)
            .await
            .unwrap_err();
        assert!(matches!(err, ControllerError::MissingCredentials));
        assert!(!controller.is_busy());
    }

    #[tokio::test]
    async fn empty_text_is_rejected_before_any_request() {
        let creds = Credentials::new("http://127.0.0.1:9", "key").unwrap();
        let controller = controller(MemoryCredentialStore::with(creds));
        let err = controller
            .summarize_text("   ", SummaryLength::Short)
            .await
            .unwrap_err();
        assert!(matches!(err, ControllerError::Request(RequestError::EmptyDocument)));
        assert!(!controller.is_busy());
    }

    #[test]
    fn saves_and_reads_credentials() {
        let controller = controller(MemoryCredentialStore::new());
        assert!(matches!(
            controller.save_credentials("https://example.com", ""),
            Err(ControllerError::Credentials(CredentialError::Incomplete))
        ));

        controller
            .save_credentials("https://example.com/", "secret")
            .unwrap();
        let creds = controller.stored_credentials().unwrap().unwrap();
        assert_eq!(creds.endpoint, "https://example.com");
    }
}

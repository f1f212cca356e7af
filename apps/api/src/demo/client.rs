use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

use crate::analysis::retrieval::RetrievalResponse;
use crate::analysis::submit::SubmitResponse;
use crate::demo::DemoError;
use crate::routes::health::HealthReport;

const SUBMIT_TIMEOUT: Duration = Duration::from_secs(30);
const READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Thin HTTP client for the match API.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, DemoError> {
        let http = Client::builder().timeout(SUBMIT_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST /analyze. Anything other than 202 is an error.
    pub async fn submit(
        &self,
        analysis_id: &str,
        resume_text: &str,
        job_description: &str,
    ) -> Result<SubmitResponse, DemoError> {
        let url = format!("{}/analyze", self.base_url);
        debug!(analysis_id, %url, "Submitting analysis");
        let response = self
            .http
            .post(&url)
            .json(&json!({
                "analysis_id": analysis_id,
                "resume_text": resume_text,
                "job_description": job_description,
            }))
            .send()
            .await?;

        if response.status() != StatusCode::ACCEPTED {
            return Err(api_error(response).await);
        }
        Ok(response.json().await?)
    }

    /// GET /results/{analysis_id}
    pub async fn get_results(&self, analysis_id: &str) -> Result<RetrievalResponse, DemoError> {
        let url = format!("{}/results/{analysis_id}", self.base_url);
        let response = self.http.get(&url).timeout(READ_TIMEOUT).send().await?;
        match response.status() {
            StatusCode::OK => Ok(response.json().await?),
            StatusCode::NOT_FOUND => Err(DemoError::NotFound),
            _ => Err(api_error(response).await),
        }
    }

    /// GET /health. A 503 still carries a report, so both codes are decoded.
    pub async fn health(&self) -> Result<(u16, HealthReport), DemoError> {
        let url = format!("{}/health", self.base_url);
        let response = self.http.get(&url).timeout(READ_TIMEOUT).send().await?;
        let status = response.status();
        if status == StatusCode::OK || status == StatusCode::SERVICE_UNAVAILABLE {
            return Ok((status.as_u16(), decode(response).await?));
        }
        Err(api_error(response).await)
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, DemoError> {
    Ok(response.json::<T>().await?)
}

async fn api_error(response: Response) -> DemoError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    DemoError::Api { status, body }
}

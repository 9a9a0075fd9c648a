//! HTTP client for the Debater analysis services.
//!
//! Argument quality, key-point analysis and term wikification are three
//! separate services sharing one API key, sent in the `apikey` header.

use crate::config::ApiConfig;
use crate::gateway::service::{AnalysisService, CommentsStatus, JobStatus, Mention};
use crate::gateway::GatewayError;
use crate::models::{KpaParams, KpaResult};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

const ARG_QUALITY: &str = "argument quality";
const KEYPOINTS: &str = "key point analysis";
const TERM_WIKIFIER: &str = "term wikifier";

/// Debater API client.
pub struct DebaterClient {
    http: reqwest::Client,
    arg_quality_url: String,
    keypoints_url: String,
    term_wikifier_url: String,
    timeout_seconds: u64,
}

#[derive(Debug, Deserialize)]
struct JobResponse {
    status: String,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StartJobResponse {
    job_id: String,
}

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    annotations: Vec<Vec<Mention>>,
}

impl DebaterClient {
    /// Create a client for the configured endpoints.
    pub fn new(config: &ApiConfig, api_key: &str) -> Result<Self, GatewayError> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(api_key).map_err(|_| {
            GatewayError::InvalidArgument("API key contains invalid header characters".to_string())
        })?;
        headers.insert("apikey", key);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .default_headers(headers)
            .build()
            .map_err(|source| GatewayError::Http {
                endpoint: "client setup".to_string(),
                source,
            })?;

        Ok(Self {
            http,
            arg_quality_url: trim_base(&config.arg_quality_url),
            keypoints_url: trim_base(&config.keypoints_url),
            term_wikifier_url: trim_base(&config.term_wikifier_url),
            timeout_seconds: config.timeout_seconds,
        })
    }

    /// Send a request, mapping transport failures to gateway errors.
    async fn send(&self, request: RequestBuilder, endpoint: &str) -> Result<Response, GatewayError> {
        debug!("Request to {}", endpoint);

        request.send().await.map_err(|e| {
            if e.is_timeout() {
                GatewayError::Timeout {
                    endpoint: endpoint.to_string(),
                    seconds: self.timeout_seconds,
                }
            } else if e.is_connect() {
                GatewayError::Connect {
                    endpoint: endpoint.to_string(),
                }
            } else {
                GatewayError::Http {
                    endpoint: endpoint.to_string(),
                    source: e,
                }
            }
        })
    }

    /// Send a request and decode a successful JSON response.
    async fn send_json(
        &self,
        service: &'static str,
        request: RequestBuilder,
        endpoint: &str,
    ) -> Result<Value, GatewayError> {
        let response = self.send(request, endpoint).await?;
        let response = ensure_success(service, response).await?;

        response.json().await.map_err(|e| {
            GatewayError::invalid_response(service, format!("failed to decode JSON: {}", e))
        })
    }
}

impl AnalysisService for DebaterClient {
    async fn score_pairs(&self, pairs: &[(String, String)]) -> Result<Vec<f64>, GatewayError> {
        let endpoint = format!("{}/score/", self.arg_quality_url);
        let body = json!({
            "sentence_topic_pairs": pairs
                .iter()
                .map(|(sentence, topic)| [sentence.as_str(), topic.as_str()])
                .collect::<Vec<_>>(),
        });

        let value = self
            .send_json(ARG_QUALITY, self.http.post(&endpoint).json(&body), &endpoint)
            .await?;
        parse_scores(value)
    }

    async fn clear_domain_if_exists(&self, domain: &str) -> Result<bool, GatewayError> {
        let endpoint = format!("{}/domains", self.keypoints_url);
        let request = self.http.delete(&endpoint).query(&[("domain", domain)]);

        let response = self.send(request, &endpoint).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        ensure_success(KEYPOINTS, response).await?;
        Ok(true)
    }

    async fn upload_comments(
        &self,
        domain: &str,
        ids: &[String],
        texts: &[String],
    ) -> Result<(), GatewayError> {
        let endpoint = format!("{}/comments", self.keypoints_url);
        let body = json!({
            "domain": domain,
            "comments_ids": ids,
            "comments_texts": texts,
            "dont_split": true,
        });

        let response = self
            .send(self.http.post(&endpoint).json(&body), &endpoint)
            .await?;
        ensure_success(KEYPOINTS, response).await?;
        Ok(())
    }

    async fn comments_status(&self, domain: &str) -> Result<CommentsStatus, GatewayError> {
        let endpoint = format!("{}/comments", self.keypoints_url);
        let request = self.http.get(&endpoint).query(&[("domain", domain)]);

        let value = self.send_json(KEYPOINTS, request, &endpoint).await?;
        serde_json::from_value(value)
            .map_err(|e| GatewayError::invalid_response(KEYPOINTS, e.to_string()))
    }

    async fn start_kp_analysis(
        &self,
        domain: &str,
        ids: &[String],
        params: &KpaParams,
    ) -> Result<String, GatewayError> {
        let endpoint = format!("{}/kp_extraction", self.keypoints_url);
        let body = json!({
            "domain": domain,
            "comments_ids": ids,
            "run_params": params,
        });

        let value = self
            .send_json(KEYPOINTS, self.http.post(&endpoint).json(&body), &endpoint)
            .await?;
        let started: StartJobResponse = serde_json::from_value(value)
            .map_err(|e| GatewayError::invalid_response(KEYPOINTS, e.to_string()))?;
        Ok(started.job_id)
    }

    async fn kp_analysis_job(&self, job_id: &str) -> Result<JobStatus, GatewayError> {
        let endpoint = format!("{}/kp_extraction", self.keypoints_url);
        let request = self.http.get(&endpoint).query(&[("job_id", job_id)]);

        let value = self.send_json(KEYPOINTS, request, &endpoint).await?;
        parse_job_status(value)
    }

    async fn annotate(&self, texts: &[String]) -> Result<Vec<Vec<Mention>>, GatewayError> {
        let endpoint = format!("{}/TermWikifier/v2/annotate", self.term_wikifier_url);
        let body = json!({ "contexts": texts });

        let value = self
            .send_json(TERM_WIKIFIER, self.http.post(&endpoint).json(&body), &endpoint)
            .await?;
        let parsed: AnnotateResponse = serde_json::from_value(value)
            .map_err(|e| GatewayError::invalid_response(TERM_WIKIFIER, e.to_string()))?;
        Ok(parsed.annotations)
    }
}

fn trim_base(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

/// Turn a non-2xx response into a status error carrying the body.
async fn ensure_success(service: &'static str, response: Response) -> Result<Response, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(GatewayError::Status {
        service,
        status: status.as_u16(),
        body,
    })
}

fn parse_scores(value: Value) -> Result<Vec<f64>, GatewayError> {
    let items = value
        .as_array()
        .ok_or_else(|| GatewayError::invalid_response(ARG_QUALITY, "expected an array of scores"))?;

    items
        .iter()
        .map(|item| {
            item.as_f64().ok_or_else(|| {
                GatewayError::invalid_response(ARG_QUALITY, format!("score {} is not a number", item))
            })
        })
        .collect()
}

fn parse_job_status(value: Value) -> Result<JobStatus, GatewayError> {
    let job: JobResponse = serde_json::from_value(value)
        .map_err(|e| GatewayError::invalid_response(KEYPOINTS, e.to_string()))?;

    match job.status.to_uppercase().as_str() {
        "PENDING" => Ok(JobStatus::Pending),
        "PROCESSING" => Ok(JobStatus::Processing),
        "DONE" => {
            let result = job.result.ok_or_else(|| {
                GatewayError::invalid_response(KEYPOINTS, "finished job has no result")
            })?;
            Ok(JobStatus::Done(parse_kpa_result(result)?))
        }
        "ERROR" => Ok(JobStatus::Failed(
            job.error.unwrap_or_else(|| "unknown error".to_string()),
        )),
        "CANCELED" => Ok(JobStatus::Failed("job was canceled".to_string())),
        other => Err(GatewayError::invalid_response(
            KEYPOINTS,
            format!("unknown job status '{}'", other),
        )),
    }
}

/// The result is sometimes delivered as a JSON-encoded string.
fn parse_kpa_result(value: Value) -> Result<KpaResult, GatewayError> {
    let parsed = match value {
        Value::String(raw) => serde_json::from_str(&raw),
        other => serde_json::from_value(other),
    };
    parsed.map_err(|e| GatewayError::invalid_response(KEYPOINTS, e.to_string()))
}

//! Contract of the remote analysis service.
//!
//! The gateway only talks to the service through [`AnalysisService`],
//! so the HTTP client can be swapped for a test double.

use crate::gateway::GatewayError;
use crate::models::{KpaParams, KpaResult};
use serde::Deserialize;

/// Processing state of the comments uploaded to a domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct CommentsStatus {
    #[serde(default)]
    pub pending_comments: usize,
    #[serde(default)]
    pub processed_comments: usize,
}

impl CommentsStatus {
    pub fn is_settled(&self) -> bool {
        self.pending_comments == 0
    }
}

/// State of a key-point analysis job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus {
    Pending,
    Processing,
    Done(KpaResult),
    Failed(String),
}

/// A concept mentioned in a text.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Mention {
    pub concept: Concept,
    #[serde(default, rename = "spanStart")]
    pub span_start: Option<usize>,
    #[serde(default, rename = "spanEnd")]
    pub span_end: Option<usize>,
}

/// A knowledge-base concept.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Concept {
    pub title: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// Operations the analysis service offers.
///
/// Calls block the render pass until the service answers; none retry.
#[allow(async_fn_in_trait)]
pub trait AnalysisService {
    /// Score `(sentence, topic)` pairs for argument quality, one score per pair.
    async fn score_pairs(&self, pairs: &[(String, String)]) -> Result<Vec<f64>, GatewayError>;

    /// Delete a domain and its data. Returns `false` when the domain did not exist.
    async fn clear_domain_if_exists(&self, domain: &str) -> Result<bool, GatewayError>;

    /// Upload comments to a domain, one sentence per comment.
    async fn upload_comments(
        &self,
        domain: &str,
        ids: &[String],
        texts: &[String],
    ) -> Result<(), GatewayError>;

    /// Report how many uploaded comments are still being processed.
    async fn comments_status(&self, domain: &str) -> Result<CommentsStatus, GatewayError>;

    /// Start a key-point analysis job and return its id.
    async fn start_kp_analysis(
        &self,
        domain: &str,
        ids: &[String],
        params: &KpaParams,
    ) -> Result<String, GatewayError>;

    /// Fetch the state of a key-point analysis job.
    async fn kp_analysis_job(&self, job_id: &str) -> Result<JobStatus, GatewayError>;

    /// Link each text to the concepts it mentions.
    async fn annotate(&self, texts: &[String]) -> Result<Vec<Vec<Mention>>, GatewayError>;
}

//! In-memory analysis service for tests.

use crate::gateway::service::{AnalysisService, CommentsStatus, Concept, JobStatus, Mention};
use crate::gateway::GatewayError;
use crate::models::{KeyPointMatching, KpaParams, KpaResult, MatchEntry, Record};
use std::collections::HashMap;
use std::sync::Mutex;

/// Build a record with a derived narrative id and a fixed category.
pub(crate) fn record(id: &str, text: &str) -> Record {
    Record {
        id: id.to_string(),
        text: text.to_string(),
        narrative_id: format!("n{}", id),
        category: "General".to_string(),
        metadata: Vec::new(),
    }
}

/// Build a match entry whose sentence text is `text <comment_id>`.
pub(crate) fn match_entry(comment_id: &str) -> MatchEntry {
    MatchEntry {
        sentence_text: format!("text {}", comment_id),
        score: 0.99,
        comment_id: comment_id.to_string(),
        sentence_id: 0,
        sents_in_comment: 1,
        span_start: 0,
        span_end: 5 + comment_id.len() as u64,
        num_tokens: 2,
        argument_quality: 0.8,
        kp_quality: 0.6,
    }
}

/// Build a result bundle from key-points and the comment ids matched to each.
pub(crate) fn kpa_result(keypoints: &[(&str, &[&str])]) -> KpaResult {
    KpaResult {
        keypoint_matchings: keypoints
            .iter()
            .map(|(keypoint, ids)| KeyPointMatching {
                keypoint: keypoint.to_string(),
                matching: ids.iter().map(|id| match_entry(id)).collect(),
            })
            .collect(),
    }
}

/// Scripted analysis service that records every call.
#[derive(Default)]
pub(crate) struct FakeService {
    scores: HashMap<String, f64>,
    score_count: Option<usize>,
    domain_missing: bool,
    pending_polls: usize,
    job_polls: usize,
    job_error: Option<String>,
    result: KpaResult,
    mentions: HashMap<String, Vec<String>>,
    log: Mutex<Vec<&'static str>>,
    pairs: Mutex<Vec<(String, String)>>,
}

impl FakeService {
    /// Scores by sentence text; unlisted sentences score 0.5.
    pub(crate) fn with_scores(mut self, scores: &[(&str, f64)]) -> Self {
        self.scores = scores
            .iter()
            .map(|(text, score)| (text.to_string(), *score))
            .collect();
        self
    }

    /// Return exactly `count` scores regardless of the request size.
    pub(crate) fn with_score_count(mut self, count: usize) -> Self {
        self.score_count = Some(count);
        self
    }

    pub(crate) fn with_existing_domain(mut self, exists: bool) -> Self {
        self.domain_missing = !exists;
        self
    }

    /// Report pending comments for the first `polls` status calls.
    pub(crate) fn with_pending_polls(mut self, polls: usize) -> Self {
        self.pending_polls = polls;
        self
    }

    /// Report the job as pending for the first `polls` job calls.
    pub(crate) fn with_job_polls(mut self, polls: usize) -> Self {
        self.job_polls = polls;
        self
    }

    pub(crate) fn with_job_error(mut self, message: &str) -> Self {
        self.job_error = Some(message.to_string());
        self
    }

    pub(crate) fn with_result(mut self, result: KpaResult) -> Self {
        self.result = result;
        self
    }

    /// Concept titles by text; unlisted texts mention nothing.
    pub(crate) fn with_mentions(mut self, mentions: &[(&str, &[&str])]) -> Self {
        self.mentions = mentions
            .iter()
            .map(|(text, titles)| {
                (
                    text.to_string(),
                    titles.iter().map(|t| t.to_string()).collect(),
                )
            })
            .collect();
        self
    }

    /// Names of the service calls made so far, in order.
    pub(crate) fn call_log(&self) -> Vec<&'static str> {
        self.log.lock().unwrap().clone()
    }

    pub(crate) fn calls(&self, name: &str) -> usize {
        self.log.lock().unwrap().iter().filter(|c| **c == name).count()
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.log.lock().unwrap().len()
    }

    pub(crate) fn scored_pairs(&self) -> Vec<(String, String)> {
        self.pairs.lock().unwrap().clone()
    }

    /// Record a call and return how many earlier calls had the same name.
    fn record_call(&self, name: &'static str) -> usize {
        let mut log = self.log.lock().unwrap();
        let earlier = log.iter().filter(|c| **c == name).count();
        log.push(name);
        earlier
    }
}

impl AnalysisService for FakeService {
    async fn score_pairs(&self, pairs: &[(String, String)]) -> Result<Vec<f64>, GatewayError> {
        self.record_call("score_pairs");
        self.pairs.lock().unwrap().extend(pairs.iter().cloned());

        let mut scores: Vec<f64> = pairs
            .iter()
            .map(|(sentence, _)| self.scores.get(sentence).copied().unwrap_or(0.5))
            .collect();
        if let Some(count) = self.score_count {
            scores.resize(count, 0.5);
        }
        Ok(scores)
    }

    async fn clear_domain_if_exists(&self, _domain: &str) -> Result<bool, GatewayError> {
        self.record_call("clear_domain_if_exists");
        Ok(!self.domain_missing)
    }

    async fn upload_comments(
        &self,
        _domain: &str,
        _ids: &[String],
        _texts: &[String],
    ) -> Result<(), GatewayError> {
        self.record_call("upload_comments");
        Ok(())
    }

    async fn comments_status(&self, _domain: &str) -> Result<CommentsStatus, GatewayError> {
        let earlier = self.record_call("comments_status");
        let pending = if earlier < self.pending_polls { 1 } else { 0 };
        Ok(CommentsStatus {
            pending_comments: pending,
            processed_comments: 1 - pending,
        })
    }

    async fn start_kp_analysis(
        &self,
        _domain: &str,
        _ids: &[String],
        _params: &KpaParams,
    ) -> Result<String, GatewayError> {
        let earlier = self.record_call("start_kp_analysis");
        Ok(format!("job-{}", earlier + 1))
    }

    async fn kp_analysis_job(&self, _job_id: &str) -> Result<JobStatus, GatewayError> {
        let earlier = self.record_call("kp_analysis_job");
        if earlier < self.job_polls {
            return Ok(JobStatus::Processing);
        }
        match self.job_error {
            Some(ref message) => Ok(JobStatus::Failed(message.clone())),
            None => Ok(JobStatus::Done(self.result.clone())),
        }
    }

    async fn annotate(&self, texts: &[String]) -> Result<Vec<Vec<Mention>>, GatewayError> {
        self.record_call("annotate");
        Ok(texts
            .iter()
            .map(|text| {
                self.mentions
                    .get(text)
                    .map(|titles| {
                        titles
                            .iter()
                            .map(|title| Mention {
                                concept: Concept {
                                    title: title.clone(),
                                    url: None,
                                },
                                span_start: None,
                                span_end: None,
                            })
                            .collect()
                    })
                    .unwrap_or_default()
            })
            .collect())
    }
}

//! Remote analysis gateway.
//!
//! The gateway wraps an [`AnalysisService`] with the three operations the
//! dashboard needs: argument-quality ranking, key-point analysis and
//! entity linking. Every operation is memoized in the gateway's own
//! [`ResultCache`], so re-rendering a session does not repeat remote calls.

pub mod cache;
pub mod debater;
pub mod error;
pub mod service;

#[cfg(test)]
pub(crate) mod testing;

pub use cache::ResultCache;
pub use debater::DebaterClient;
pub use error::GatewayError;
pub use service::AnalysisService;
use service::JobStatus;

use crate::models::{KpaParams, KpaResult, Record, ScoredSentence};
use cache::{KeypointsKey, RankKey};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Cached access to the analysis service for one dashboard session.
pub struct Gateway<S> {
    service: S,
    cache: ResultCache,
    poll_interval: Duration,
    show_progress: bool,
}

impl<S: AnalysisService> Gateway<S> {
    /// Create a gateway that polls long-running jobs every `poll_interval`.
    pub fn new(service: S, poll_interval: Duration) -> Self {
        Self {
            service,
            cache: ResultCache::new(),
            poll_interval,
            show_progress: false,
        }
    }

    /// Show spinners while waiting on the service.
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    #[cfg(test)]
    pub(crate) fn service(&self) -> &S {
        &self.service
    }

    /// Rank records by argument quality against `topic` and keep the best `top_k`.
    ///
    /// Scores are sorted in descending order; ties keep input order.
    pub async fn rank(
        &self,
        topic: &str,
        records: &[Record],
        top_k: usize,
    ) -> Result<Arc<Vec<ScoredSentence>>, GatewayError> {
        let key = RankKey::new(topic, records, top_k);
        self.cache
            .ranked
            .get_or_try_insert_with(key, || self.rank_uncached(topic, records, top_k))
            .await
    }

    async fn rank_uncached(
        &self,
        topic: &str,
        records: &[Record],
        top_k: usize,
    ) -> Result<Vec<ScoredSentence>, GatewayError> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        info!("Scoring {} sentences for argument quality", records.len());

        let pairs: Vec<(String, String)> = records
            .iter()
            .map(|record| (record.text.clone(), topic.to_string()))
            .collect();

        let scores = self.service.score_pairs(&pairs).await?;

        if scores.len() != records.len() {
            return Err(GatewayError::invalid_response(
                "argument quality",
                format!("expected {} scores, got {}", records.len(), scores.len()),
            ));
        }
        if let Some(bad) = scores.iter().find(|score| !score.is_finite()) {
            return Err(GatewayError::invalid_response(
                "argument quality",
                format!("non-finite score {}", bad),
            ));
        }

        let mut scored: Vec<ScoredSentence> = records
            .iter()
            .zip(scores)
            .map(|(record, score)| ScoredSentence {
                record: record.clone(),
                score,
            })
            .collect();

        // Stable sort keeps input order among equal scores
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(top_k);

        debug!("Kept top {} of {} sentences", scored.len(), records.len());
        Ok(scored)
    }

    /// Run key-point analysis over the given comments in `domain`.
    ///
    /// The domain is cleared first, so each run starts from an empty namespace.
    pub async fn analyze_keypoints(
        &self,
        domain: &str,
        ids: &[String],
        texts: &[String],
        params: &KpaParams,
    ) -> Result<Arc<KpaResult>, GatewayError> {
        if ids.len() != texts.len() {
            return Err(GatewayError::InvalidArgument(format!(
                "got {} comment ids but {} comment texts",
                ids.len(),
                texts.len()
            )));
        }

        let key = KeypointsKey::new(domain, ids, texts, params);
        self.cache
            .keypoints
            .get_or_try_insert_with(key, || {
                self.analyze_keypoints_uncached(domain, ids, texts, params)
            })
            .await
    }

    async fn analyze_keypoints_uncached(
        &self,
        domain: &str,
        ids: &[String],
        texts: &[String],
        params: &KpaParams,
    ) -> Result<KpaResult, GatewayError> {
        if self.service.clear_domain_if_exists(domain).await? {
            info!("Cleared domain {}", domain);
        } else {
            debug!("Domain {} did not exist, nothing to clear", domain);
        }

        info!("Uploading {} comments to domain {}", ids.len(), domain);
        self.service.upload_comments(domain, ids, texts).await?;
        self.wait_for_comments(domain).await?;

        let job_id = self.service.start_kp_analysis(domain, ids, params).await?;
        info!("Started key point analysis job {}", job_id);

        let result = self.wait_for_job(&job_id).await?;
        info!(
            "Job {} finished with {} key points and {} matches",
            job_id,
            result.keypoint_matchings.len(),
            result.match_count()
        );

        Ok(result)
    }

    /// Poll until every uploaded comment has been processed.
    async fn wait_for_comments(&self, domain: &str) -> Result<(), GatewayError> {
        let spinner = self.spinner("Processing comments...");

        loop {
            let status = self.service.comments_status(domain).await?;
            debug!(
                "Domain {}: {} pending, {} processed",
                domain, status.pending_comments, status.processed_comments
            );

            if status.is_settled() {
                break;
            }
            if let Some(ref pb) = spinner {
                pb.set_message(format!(
                    "Processing comments... {} pending",
                    status.pending_comments
                ));
            }
            tokio::time::sleep(self.poll_interval).await;
        }

        if let Some(pb) = spinner {
            pb.finish_and_clear();
        }
        Ok(())
    }

    /// Poll a key-point analysis job until it finishes.
    async fn wait_for_job(&self, job_id: &str) -> Result<KpaResult, GatewayError> {
        let spinner = self.spinner("Waiting for key point analysis...");

        let outcome = loop {
            match self.service.kp_analysis_job(job_id).await {
                Ok(JobStatus::Done(result)) => break Ok(result),
                Ok(JobStatus::Failed(message)) => {
                    break Err(GatewayError::JobFailed {
                        job_id: job_id.to_string(),
                        message,
                    })
                }
                Ok(status) => {
                    debug!("Job {} is {:?}", job_id, status);
                    tokio::time::sleep(self.poll_interval).await;
                }
                Err(e) => break Err(e),
            }
        };

        if let Some(pb) = spinner {
            pb.finish_and_clear();
        }
        outcome
    }

    /// Link each text to the set of concept titles it mentions.
    pub async fn link_entities(
        &self,
        texts: &[String],
    ) -> Result<Arc<Vec<BTreeSet<String>>>, GatewayError> {
        self.cache
            .links
            .get_or_try_insert_with(texts.to_vec(), || self.link_entities_uncached(texts))
            .await
    }

    async fn link_entities_uncached(
        &self,
        texts: &[String],
    ) -> Result<Vec<BTreeSet<String>>, GatewayError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Linking entities in {} texts", texts.len());
        let annotations = self.service.annotate(texts).await?;

        if annotations.len() != texts.len() {
            return Err(GatewayError::invalid_response(
                "term wikifier",
                format!(
                    "expected {} annotation lists, got {}",
                    texts.len(),
                    annotations.len()
                ),
            ));
        }

        Ok(annotations
            .into_iter()
            .map(|mentions| mentions.into_iter().map(|m| m.concept.title).collect())
            .collect())
    }

    fn spinner(&self, message: &'static str) -> Option<ProgressBar> {
        if !self.show_progress {
            return None;
        }

        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed}] {msg}") {
            pb.set_style(style);
        }
        pb.set_message(message);
        pb.enable_steady_tick(Duration::from_millis(120));
        Some(pb)
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{record, FakeService};
    use super::*;

    fn gateway(service: FakeService) -> Gateway<FakeService> {
        Gateway::new(service, Duration::from_millis(1))
    }

    fn params() -> KpaParams {
        KpaParams {
            mapping_threshold: 0.98,
            n_top_kps: 5,
        }
    }

    #[tokio::test]
    async fn test_rank_orders_by_descending_score() {
        let records = vec![record("1", "a"), record("2", "b"), record("3", "c")];
        let service = FakeService::default().with_scores(&[("a", 0.2), ("b", 0.9), ("c", 0.5)]);
        let gw = gateway(service);

        let ranked = gw.rank("topic", &records, 10).await.unwrap();

        let ids: Vec<_> = ranked.iter().map(|s| s.record.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "3", "1"]);
        assert!(ranked.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[tokio::test]
    async fn test_rank_truncates_to_top_k() {
        let records: Vec<_> = (0..5).map(|i| record(&i.to_string(), &format!("s{}", i))).collect();
        let gw = gateway(FakeService::default());

        assert_eq!(gw.rank("topic", &records, 3).await.unwrap().len(), 3);
        assert_eq!(gw.rank("topic", &records, 50).await.unwrap().len(), 5);
        assert_eq!(gw.rank("topic", &records, 0).await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_rank_ties_keep_input_order() {
        let records = vec![
            record("1", "a"),
            record("2", "b"),
            record("3", "c"),
            record("4", "d"),
        ];
        let service = FakeService::default().with_scores(&[
            ("a", 0.5),
            ("b", 0.7),
            ("c", 0.5),
            ("d", 0.7),
        ]);
        let gw = gateway(service);

        let ranked = gw.rank("topic", &records, 4).await.unwrap();
        let ids: Vec<_> = ranked.iter().map(|s| s.record.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "4", "1", "3"]);
    }

    #[tokio::test]
    async fn test_rank_sends_topic_with_each_sentence() {
        let records = vec![record("1", "a"), record("2", "b")];
        let gw = gateway(FakeService::default());

        gw.rank("heart surgery", &records, 2).await.unwrap();

        let pairs = gw.service().scored_pairs();
        assert_eq!(
            pairs,
            vec![
                ("a".to_string(), "heart surgery".to_string()),
                ("b".to_string(), "heart surgery".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_rank_is_cached() {
        let records = vec![record("1", "a"), record("2", "b")];
        let gw = gateway(FakeService::default());

        let first = gw.rank("topic", &records, 2).await.unwrap();
        let second = gw.rank("topic", &records, 2).await.unwrap();
        let other_topic = gw.rank("other", &records, 2).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert!(!Arc::ptr_eq(&first, &other_topic));
        assert_eq!(gw.service().calls("score_pairs"), 2);
    }

    #[tokio::test]
    async fn test_rank_rejects_short_response() {
        let records = vec![record("1", "a"), record("2", "b")];
        let gw = gateway(FakeService::default().with_score_count(1));

        let err = gw.rank("topic", &records, 2).await.unwrap_err();
        assert!(matches!(err, GatewayError::InvalidResponse { .. }));
        assert_eq!(gw.cache().stats().entries, 0);
    }

    #[tokio::test]
    async fn test_rank_rejects_non_finite_score() {
        let records = vec![record("1", "a")];
        let gw = gateway(FakeService::default().with_scores(&[("a", f64::NAN)]));

        let err = gw.rank("topic", &records, 1).await.unwrap_err();
        assert!(matches!(err, GatewayError::InvalidResponse { .. }));
    }

    #[tokio::test]
    async fn test_analyze_keypoints_runs_full_protocol() {
        let service = FakeService::default()
            .with_pending_polls(2)
            .with_job_polls(3)
            .with_result(testing::kpa_result(&[("kp1", &["1", "2"])]));
        let gw = gateway(service);
        let ids = vec!["1".to_string(), "2".to_string()];
        let texts = vec!["a".to_string(), "b".to_string()];

        let result = gw
            .analyze_keypoints("demo", &ids, &texts, &params())
            .await
            .unwrap();

        assert_eq!(result.match_count(), 2);
        let service = gw.service();
        assert_eq!(
            service.call_log(),
            vec![
                "clear_domain_if_exists",
                "upload_comments",
                "comments_status",
                "comments_status",
                "comments_status",
                "start_kp_analysis",
                "kp_analysis_job",
                "kp_analysis_job",
                "kp_analysis_job",
                "kp_analysis_job",
            ]
        );
    }

    #[tokio::test]
    async fn test_analyze_keypoints_tolerates_absent_domain() {
        let service = FakeService::default().with_existing_domain(false);
        let gw = gateway(service);
        let ids = vec!["1".to_string()];
        let texts = vec!["a".to_string()];

        assert!(gw
            .analyze_keypoints("fresh", &ids, &texts, &params())
            .await
            .is_ok());
        assert_eq!(gw.service().calls("upload_comments"), 1);
    }

    #[tokio::test]
    async fn test_analyze_keypoints_propagates_job_failure() {
        let gw = gateway(FakeService::default().with_job_error("out of quota"));
        let ids = vec!["1".to_string()];
        let texts = vec!["a".to_string()];

        let err = gw
            .analyze_keypoints("demo", &ids, &texts, &params())
            .await
            .unwrap_err();
        match err {
            GatewayError::JobFailed { message, .. } => assert_eq!(message, "out of quota"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_analyze_keypoints_rejects_mismatched_inputs() {
        let gw = gateway(FakeService::default());
        let ids = vec!["1".to_string(), "2".to_string()];
        let texts = vec!["a".to_string()];

        let err = gw
            .analyze_keypoints("demo", &ids, &texts, &params())
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::InvalidArgument(_)));
        assert!(gw.service().call_log().is_empty());
    }

    #[tokio::test]
    async fn test_analyze_keypoints_is_cached() {
        let gw = gateway(FakeService::default());
        let ids = vec!["1".to_string()];
        let texts = vec!["a".to_string()];

        let first = gw
            .analyze_keypoints("demo", &ids, &texts, &params())
            .await
            .unwrap();
        let second = gw
            .analyze_keypoints("demo", &ids, &texts, &params())
            .await
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(gw.service().calls("start_kp_analysis"), 1);
        assert_eq!(gw.service().calls("clear_domain_if_exists"), 1);
    }

    #[tokio::test]
    async fn test_link_entities_returns_title_sets() {
        let service = FakeService::default().with_mentions(&[
            ("Stent placed in artery.", &["Stent", "Artery", "Stent"]),
            ("Knee pain.", &["Knee"]),
        ]);
        let gw = gateway(service);
        let texts = vec![
            "Stent placed in artery.".to_string(),
            "Knee pain.".to_string(),
        ];

        let linked = gw.link_entities(&texts).await.unwrap();

        assert_eq!(linked.len(), 2);
        assert_eq!(
            linked[0].iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["Artery", "Stent"]
        );
        assert!(linked[1].contains("Knee"));

        let again = gw.link_entities(&texts).await.unwrap();
        assert!(Arc::ptr_eq(&linked, &again));
        assert_eq!(gw.service().calls("annotate"), 1);
    }
}

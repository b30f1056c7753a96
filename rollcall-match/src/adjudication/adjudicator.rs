//! Adjudicator backed by a generative-language oracle

use super::prompt::build_prompt;
use super::retry::RetryPolicy;
use super::{parse_adjudication, validate_adjudication, Adjudication, Adjudicator, Oracle, OracleError};
use async_trait::async_trait;
use tracing::{debug, warn};

/// Prompt, validate and retry on top of an [`Oracle`]
///
/// Never returns `Err`: once every attempt has failed the verdict is
/// "no match, zero confidence" with the last failure as its reason.
pub struct OracleAdjudicator<O> {
    oracle: O,
    retry: RetryPolicy,
}

impl<O: Oracle> OracleAdjudicator<O> {
    pub fn new(oracle: O) -> Self {
        Self {
            oracle,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    async fn attempt(
        &self,
        prompt: &str,
        target: &str,
        candidates: &[String],
    ) -> Result<Adjudication, OracleError> {
        let text = self.oracle.generate(prompt).await?;
        let adjudication = parse_adjudication(&text)?;
        validate_adjudication(&adjudication, target, candidates)?;
        Ok(adjudication)
    }
}

#[async_trait]
impl<O: Oracle> Adjudicator for OracleAdjudicator<O> {
    async fn adjudicate(
        &self,
        target: &str,
        candidates: &[String],
    ) -> rollcall_common::Result<Adjudication> {
        let prompt = build_prompt(target, candidates);
        let attempts = self.retry.attempts();
        let mut last_error: Option<OracleError> = None;

        for attempt in 0..attempts {
            if attempt > 0 {
                let delay = self.retry.delay_before(attempt);
                debug!(
                    target_name = %target,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    "Backing off before adjudication retry"
                );
                tokio::time::sleep(delay).await;
            }

            match self.attempt(&prompt, target, candidates).await {
                Ok(adjudication) => {
                    debug!(
                        target_name = %target,
                        best_match = ?adjudication.best_match,
                        confidence = adjudication.confidence,
                        attempt = attempt + 1,
                        "Adjudication complete"
                    );
                    return Ok(adjudication);
                }
                Err(e) => {
                    warn!(
                        target_name = %target,
                        attempt = attempt + 1,
                        error = %e,
                        "Adjudication attempt failed"
                    );
                    last_error = Some(e);
                }
            }
        }

        warn!(
            target_name = %target,
            attempts,
            "Adjudication exhausted, treating as no match"
        );
        Ok(Adjudication::exhausted(target, attempts, last_error.as_ref()))
    }
}

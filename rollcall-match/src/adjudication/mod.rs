//! Oracle adjudication of rule-based candidates
//!
//! A generative language model confirms or denies one candidate pairing and
//! reports a confidence. The model is untrusted: every response is parsed and
//! validated against the request before use.
//!
//! # Architecture
//! - [`Oracle`]: raw text-in/text-out transport ([`gemini::GeminiClient`])
//! - [`Adjudicator`]: confirm/deny capability used by the reconciliation loop
//! - [`OracleAdjudicator`]: prompt + validation + retry on top of an `Oracle`

pub mod adjudicator;
pub mod gemini;
pub mod prompt;
pub mod retry;

pub use adjudicator::OracleAdjudicator;
pub use gemini::GeminiClient;
pub use retry::RetryPolicy;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Oracle transport and format errors
///
/// All variants are recoverable: the adjudicator retries them and finally
/// downgrades to a "no match" verdict.
#[derive(Debug, Error)]
pub enum OracleError {
    /// Network request failed (connect, timeout, TLS)
    #[error("Network error: {0}")]
    Network(String),

    /// Oracle answered with a non-success HTTP status
    #[error("Oracle API returned {status}: {body}")]
    Api { status: u16, body: String },

    /// Body was not the expected JSON
    #[error("Invalid JSON response: {0}")]
    Parse(String),

    /// Oracle answered without any text
    #[error("Oracle returned an empty response")]
    EmptyResponse,

    /// Well-formed response that contradicts the request
    #[error("Invalid adjudication response: {0}")]
    Invalid(String),
}

impl From<OracleError> for rollcall_common::Error {
    fn from(err: OracleError) -> Self {
        rollcall_common::Error::Oracle(err.to_string())
    }
}

/// Kind of correspondence the oracle reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchType {
    Exact,
    Nickname,
    Spelling,
    OrderVariant,
    TokenTrim,
    AiInferred,
    /// Any label the oracle invents; not grounds for rejection
    #[serde(other)]
    Other,
}

/// Oracle verdict for one target name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Adjudication {
    pub zoom_name: String,
    pub best_match: Option<String>,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_type: Option<MatchType>,
}

impl Adjudication {
    /// Verdict returned once every attempt has failed
    pub fn exhausted(target: &str, attempts: u32, last_error: Option<&OracleError>) -> Self {
        let detail = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown error".to_string());
        Self {
            zoom_name: target.to_string(),
            best_match: None,
            confidence: 0.0,
            reason: Some(format!(
                "AI adjudication failed after {} attempts: {}",
                attempts, detail
            )),
            match_type: Some(MatchType::AiInferred),
        }
    }

    pub fn is_match(&self) -> bool {
        self.best_match.is_some()
    }
}

/// Confirm/deny capability
///
/// Swappable so tests and alternative models never touch the loop.
#[async_trait]
pub trait Adjudicator: Send + Sync {
    /// Decide which of `candidates` (if any) is the same person as `target`
    async fn adjudicate(
        &self,
        target: &str,
        candidates: &[String],
    ) -> rollcall_common::Result<Adjudication>;
}

/// Raw oracle transport: prompt in, response text out
#[async_trait]
pub trait Oracle: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, OracleError>;
}

/// Parse an oracle reply into an [`Adjudication`]
///
/// Accepts an optional Markdown code fence around the JSON. `bestMatch` must
/// be present (possibly `null`); a silently omitted field is rejected.
pub fn parse_adjudication(text: &str) -> Result<Adjudication, OracleError> {
    let body = strip_code_fence(text.trim());

    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|_| OracleError::Parse(text.to_string()))?;

    let Some(object) = value.as_object() else {
        return Err(OracleError::Invalid(format!("expected a JSON object, got {}", value)));
    };
    if !object.contains_key("bestMatch") {
        return Err(OracleError::Invalid(format!("missing bestMatch: {}", value)));
    }

    serde_json::from_value(value.clone())
        .map_err(|e| OracleError::Invalid(format!("{} ({})", value, e)))
}

/// Check a parsed verdict against the request that produced it
pub fn validate_adjudication(
    adjudication: &Adjudication,
    expected_target: &str,
    candidates: &[String],
) -> Result<(), OracleError> {
    if adjudication.zoom_name != expected_target {
        return Err(OracleError::Invalid(format!(
            "zoomName {:?} does not echo target {:?}",
            adjudication.zoom_name, expected_target
        )));
    }

    let confidence = adjudication.confidence;
    if !confidence.is_finite() || !(0.0..=1.0).contains(&confidence) {
        return Err(OracleError::Invalid(format!(
            "confidence {} outside [0, 1]",
            confidence
        )));
    }

    if let Some(best) = &adjudication.best_match {
        if !candidates.iter().any(|c| c == best) {
            return Err(OracleError::Invalid(format!(
                "bestMatch {:?} is not one of the candidates",
                best
            )));
        }
    }

    Ok(())
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates() -> Vec<String> {
        vec!["Klaudio_AI".to_string()]
    }

    #[test]
    fn test_parse_full_response() {
        let adj = parse_adjudication(
            r#"{"zoomName":"Klaudio P.H","bestMatch":"Klaudio_AI","confidence":0.85,
                "reason":"same first name + initial","matchType":"token-trim"}"#,
        )
        .unwrap();

        assert_eq!(adj.zoom_name, "Klaudio P.H");
        assert_eq!(adj.best_match.as_deref(), Some("Klaudio_AI"));
        assert_eq!(adj.match_type, Some(MatchType::TokenTrim));
        assert!(validate_adjudication(&adj, "Klaudio P.H", &candidates()).is_ok());
    }

    #[test]
    fn test_parse_fenced_and_unknown_match_type() {
        let adj = parse_adjudication(
            "```json\n{\"zoomName\":\"x\",\"bestMatch\":null,\"confidence\":0,\"matchType\":\"vibes\"}\n```",
        )
        .unwrap();
        assert_eq!(adj.best_match, None);
        assert_eq!(adj.match_type, Some(MatchType::Other));
    }

    #[test]
    fn test_parse_rejects_non_json_and_missing_fields() {
        assert!(matches!(
            parse_adjudication("I think they match"),
            Err(OracleError::Parse(_))
        ));
        assert!(matches!(
            parse_adjudication(r#"{"zoomName":"x","confidence":0.9}"#),
            Err(OracleError::Invalid(_))
        ));
        assert!(matches!(
            parse_adjudication(r#"{"zoomName":"x","bestMatch":null,"confidence":"high"}"#),
            Err(OracleError::Invalid(_))
        ));
        assert!(matches!(
            parse_adjudication("[1, 2]"),
            Err(OracleError::Invalid(_))
        ));
    }

    #[test]
    fn test_validate_target_echo() {
        let adj = Adjudication {
            zoom_name: "klaudio p.h".to_string(),
            best_match: None,
            confidence: 0.2,
            reason: None,
            match_type: None,
        };
        assert!(validate_adjudication(&adj, "Klaudio P.H", &candidates()).is_err());
    }

    #[test]
    fn test_validate_confidence_range() {
        for confidence in [-0.1, 1.01, f64::NAN] {
            let adj = Adjudication {
                zoom_name: "t".to_string(),
                best_match: None,
                confidence,
                reason: None,
                match_type: None,
            };
            assert!(validate_adjudication(&adj, "t", &candidates()).is_err());
        }
    }

    #[test]
    fn test_validate_rejects_fabricated_candidate() {
        let adj = Adjudication {
            zoom_name: "t".to_string(),
            best_match: Some("klaudio_ai".to_string()),
            confidence: 0.9,
            reason: None,
            match_type: None,
        };
        let err = validate_adjudication(&adj, "t", &candidates()).unwrap_err();
        assert!(err.to_string().contains("not one of the candidates"));
    }

    #[test]
    fn test_exhausted_verdict() {
        let err = OracleError::EmptyResponse;
        let adj = Adjudication::exhausted("Klaudio P.H", 3, Some(&err));
        assert_eq!(adj.zoom_name, "Klaudio P.H");
        assert_eq!(adj.best_match, None);
        assert_eq!(adj.confidence, 0.0);
        assert_eq!(adj.match_type, Some(MatchType::AiInferred));
        assert!(adj.reason.unwrap().contains("after 3 attempts"));
    }
}

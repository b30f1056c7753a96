//! Instruction text sent to the oracle
//!
//! The wording encodes the matching policy: component overlap threshold,
//! ignored suffixes, Indonesian abbreviation equivalences, confidence bands
//! and the null-forcing rule. Changing it changes adjudication behavior.

/// Confidence at or below which the oracle must answer `bestMatch = null`
pub const NULL_CONFIDENCE_CEILING: f64 = 0.6;

/// Render the adjudication instruction for one request
pub fn build_prompt(target: &str, candidates: &[String]) -> String {
    let candidates_json =
        serde_json::to_string(candidates).unwrap_or_else(|_| "[]".to_string());
    // Escaped so the oracle can echo it back verbatim inside JSON
    let target_json = serde_json::to_string(target).unwrap_or_else(|_| "\"\"".to_string());

    format!(
        r#"You are an expert at matching Indonesian names. Given a Zoom participant name and candidate mentee names, select the best match.

Zoom name: {target_json}
Candidates: {candidates_json}

STRICT MATCHING RULES:
1. Names must have substantial overlap, not just common words like "Dwi", "Muhammad", "Putri"
2. At least 60% of the meaningful name components must match or be variations of each other
3. Consider the full name structure, not just individual words
4. Ignore program suffixes such as "_Web", "_AI", "Web Development" and parenthetical nicknames "(nickname)"
5. Treat these Indonesian name variations as equivalent: "Muhammad/Muh./M/Mhd", "Dwi/Dwy", "Bella/Bela"
6. Consider name order variations and nicknames

POSITIVE EXAMPLES (good matches):
- "Klaudio_AI" -> "Klaudio P.H" (same first name + initial)
- "adinafadillah" -> "Adina Fadillah Balqis" (first + middle name match)
- "bella_Web Dev" -> "Bela Putri Carolian" (nickname variation)
- "FAUZAN DWI NUGROHO_Web" -> "Fauzan Dwi Nugroho" (exact match)

NEGATIVE EXAMPLES (bad matches to avoid):
- "Indri Dwi Lestari" -> "Muhammad Trio Novrian" (only "Dwi" in common)
- "Indri Dwi Lestari" -> "Fauzan Dwi Nugroho" (only "Dwi" in common)
- "Alya Massardi" -> "Alyion Nita" (only the "Aly" prefix in common)
- "Vebri Pratama" -> "Agnes Monika" (completely different)
- "Deny Wahyu" -> "Vanessa" (no meaningful overlap)

CONFIDENCE SCORING:
- 0.9-1.0: exact or very close match (same person, different format)
- 0.7-0.8: strong match with clear name variations
- 0.5-0.6: possible match but uncertain
- 0.0-0.4: poor match, likely different people

If confidence <= {ceiling} OR only common words like "Muhammad", "Putri", "Dwi", "Ahmad" match, set bestMatch to null.
Require at least 2 meaningful name components to correspond. Before deciding, check that the first names actually match, that at least 2 components correspond, and that this is likely the same person with different formatting. If any answer is "no" or "uncertain", set bestMatch to null.

bestMatch must be copied exactly from the Candidates list, or be null.

Return a single JSON object and nothing else:
{{"zoomName": {target_json}, "bestMatch": "exact_candidate_or_null", "confidence": 0.0, "reason": "short explanation", "matchType": "exact|nickname|spelling|order-variant|token-trim|ai-inferred"}}
"#,
        target_json = target_json,
        candidates_json = candidates_json,
        ceiling = NULL_CONFIDENCE_CEILING,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_embeds_request() {
        let prompt = build_prompt("Klaudio P.H", &["Klaudio_AI".to_string()]);
        assert!(prompt.contains("Zoom name: \"Klaudio P.H\""));
        assert!(prompt.contains("Candidates: [\"Klaudio_AI\"]"));
        assert!(prompt.contains("{\"zoomName\": \"Klaudio P.H\""));
    }

    #[test]
    fn test_prompt_encodes_policy() {
        let prompt = build_prompt("x", &[]);
        assert!(prompt.contains("60%"));
        assert!(prompt.contains("Muhammad/Muh./M/Mhd"));
        assert!(prompt.contains("0.9-1.0"));
        assert!(prompt.contains("0.0-0.4"));
        assert!(prompt.contains("If confidence <= 0.6"));
        assert!(prompt.contains("Candidates: []"));
    }

    #[test]
    fn test_prompt_escapes_quotes() {
        let prompt = build_prompt("Budi \"Bud\" S", &[]);
        assert!(prompt.contains(r#"Zoom name: "Budi \"Bud\" S""#));
    }
}

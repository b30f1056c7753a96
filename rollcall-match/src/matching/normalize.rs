//! Name canonicalization and variation extraction

/// Program tags that may follow a name, e.g. `Klaudio_AI`, `bella_Web Dev`
const PROGRAM_TAGS: [&str; 3] = ["_web", "_ai", "_artificial"];

/// Canonicalize a raw name
///
/// Lower-cases, strips everything outside `[a-z0-9]` and whitespace, then
/// collapses whitespace runs to a single space and trims. Idempotent.
pub fn normalize(name: &str) -> String {
    let kept: String = name
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace())
        .collect();

    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalized alternate renderings of a name
///
/// Always contains `normalize(raw)`. Adds, when they carry information:
/// - the lone token of a single-token name (length > 2)
/// - the prefix before a program tag
/// - the first parenthetical group (length > 2)
///
/// Deduplicated; order is not significant to callers.
pub fn variations(raw: &str) -> Vec<String> {
    let mut out = vec![normalize(raw)];

    let parts: Vec<&str> = raw
        .split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .collect();
    if let [single] = parts.as_slice() {
        let token = normalize(single);
        if token.len() > 2 {
            push_unique(&mut out, token);
        }
    }

    if let Some(prefix) = before_program_tag(raw) {
        push_unique(&mut out, normalize(prefix));
    }

    if let Some(inner) = first_parenthetical(raw) {
        let nickname = normalize(inner);
        if nickname.len() > 2 {
            push_unique(&mut out, nickname);
        }
    }

    out
}

fn push_unique(out: &mut Vec<String>, value: String) {
    if !out.contains(&value) {
        out.push(value);
    }
}

/// Substring preceding the earliest case-insensitive program tag
fn before_program_tag(raw: &str) -> Option<&str> {
    // ASCII lowering keeps byte offsets aligned with `raw`.
    let lowered = raw.to_ascii_lowercase();
    PROGRAM_TAGS
        .iter()
        .filter_map(|tag| lowered.find(tag))
        .min()
        .map(|idx| &raw[..idx])
}

/// Content of the first `( ... )` group with at least one character inside
fn first_parenthetical(raw: &str) -> Option<&str> {
    for (open, _) in raw.match_indices('(') {
        let rest = &raw[open + 1..];
        match rest.find(')') {
            Some(0) => continue,
            Some(close) => return Some(&rest[..close]),
            None => return None,
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted(mut v: Vec<String>) -> Vec<String> {
        v.sort();
        v
    }

    #[test]
    fn test_normalize_basic() {
        assert_eq!(normalize("  FAUZAN   Dwi_Nugroho!! "), "fauzan dwinugroho");
        assert_eq!(normalize("Klaudio P.H"), "klaudio ph");
        assert_eq!(normalize("Bela (Bella) Putri"), "bela bella putri");
        assert_eq!(normalize("___"), "");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_normalize_idempotent() {
        for s in [
            "Klaudio_AI",
            "  M. Rizky\t(Iki) ",
            "ÉLODIE-Marie",
            "123 abc___DEF",
            "",
            "\u{00A0}Adina\u{00A0}Fadillah",
        ] {
            let once = normalize(s);
            assert_eq!(normalize(&once), once, "not idempotent for {:?}", s);
        }
    }

    #[test]
    fn test_variations_single_token_with_tag() {
        // Two parts, so only the program-tag rule contributes
        let v = sorted(variations("Klaudio_AI"));
        assert_eq!(v, vec!["klaudio".to_string(), "klaudioai".to_string()]);
    }

    #[test]
    fn test_variations_single_token_name() {
        assert_eq!(variations("adinafadillah"), vec!["adinafadillah".to_string()]);
        // Short single token is not added twice and not filtered from the base
        assert_eq!(variations("Al"), vec!["al".to_string()]);
    }

    #[test]
    fn test_variations_program_tag_case_insensitive() {
        let v = variations("bella_Web Dev");
        assert!(v.contains(&"bellaweb dev".to_string()));
        assert!(v.contains(&"bella".to_string()));

        let v = variations("Rina_Artificial Intelligence");
        assert!(v.contains(&"rina".to_string()));
    }

    #[test]
    fn test_variations_parenthetical() {
        let v = variations("Muhammad Rizky (Iki)");
        assert_eq!(v, vec!["muhammad rizky iki".to_string(), "iki".to_string()]);

        let v = variations("Bela Putri (Bella)");
        assert!(v.contains(&"bella".to_string()));

        // Empty group is skipped in favour of the next one
        let v = variations("A () B (Nana)");
        assert!(v.contains(&"nana".to_string()));
    }

    #[test]
    fn test_variations_always_contain_normalized() {
        for raw in ["Klaudio P.H", "x", "FAUZAN DWI NUGROHO_Web", "(Bob)"] {
            assert!(variations(raw).contains(&normalize(raw)));
        }
    }

    #[test]
    fn test_variations_deduplicated() {
        let v = variations("Bella_Web");
        let mut unique = v.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(v.len(), unique.len());
    }
}

//! Identifier normalization
//!
//! LLMs spell the same entity as `acme_corp`, `Acme Corp` or `ACME  corp`.
//! Every node id and relationship endpoint goes through [`normalize_id`]
//! once, inside the merger, so the merged graph only carries canonical ids.

/// Canonicalize an entity identifier.
///
/// Underscores and whitespace become a single space. The first letter of
/// each word is upper-cased and the remaining letters lower-cased. Digits and
/// punctuation are copied unchanged and do not start a new word. The result
/// is trimmed.
pub fn normalize_id(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut capitalize = true;
    let mut pending_space = false;

    for c in raw.chars() {
        if c == '_' || c.is_whitespace() {
            pending_space = true;
            capitalize = true;
            continue;
        }

        if pending_space {
            if !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
        }

        if c.is_alphabetic() {
            if capitalize {
                push_single_mapped(&mut out, c, c.to_uppercase());
                capitalize = false;
            } else {
                push_single_mapped(&mut out, c, c.to_lowercase());
            }
        } else {
            out.push(c);
        }
    }

    out
}

/// Push the case-mapped char, or the original when the mapping expands
/// to several chars (`ß` -> `SS`), which keeps the function idempotent.
fn push_single_mapped(out: &mut String, original: char, mut mapped: impl Iterator<Item = char>) {
    match (mapped.next(), mapped.next()) {
        (Some(single), None) => out.push(single),
        _ => out.push(original),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_basic_capitalization() {
        assert_eq!(normalize_id("alice"), "Alice");
        assert_eq!(normalize_id("ACME"), "Acme");
        assert_eq!(normalize_id("acme_corp"), "Acme Corp");
        assert_eq!(normalize_id("new york city"), "New York City");
    }

    #[test]
    fn test_separators_collapse_and_trim() {
        assert_eq!(normalize_id("  acme__corp \t inc_ "), "Acme Corp Inc");
        assert_eq!(normalize_id("___"), "");
        assert_eq!(normalize_id(""), "");
    }

    #[test]
    fn test_punctuation_does_not_start_word() {
        assert_eq!(normalize_id("o'neil"), "O'neil");
        assert_eq!(normalize_id("gpt-4o"), "Gpt-4o");
        assert_eq!(normalize_id("3m company"), "3M Company");
    }

    #[test]
    fn test_expanding_case_maps_kept() {
        assert_eq!(normalize_id("ßtraße"), "ßtraße");
        assert_eq!(normalize_id(&normalize_id("ßtraße")), normalize_id("ßtraße"));
    }

    proptest! {
        #[test]
        fn prop_idempotent(s in "[a-zA-Z0-9 _\\-'.éÉßøÆ\t]{0,40}") {
            let once = normalize_id(&s);
            prop_assert_eq!(normalize_id(&once), once);
        }

        #[test]
        fn prop_no_edge_or_double_spaces(s in "[a-z _]{0,30}") {
            let out = normalize_id(&s);
            prop_assert!(!out.starts_with(' '));
            prop_assert!(!out.ends_with(' '));
            prop_assert!(!out.contains("  "));
        }
    }
}

use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::LazyLock;

// "(Smith et al., 2020)": author text starts upper-case, no nested parens.
static INLINE_CITATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\(([A-Z][^()]*?),\s*(\d{4})\)").expect("citation pattern is valid")
});

/// Rewrite every `(Author, Year)` citation as `[n]`, numbering distinct
/// citations from 1 in first-seen order.
///
/// Returns the rewritten text and the bibliography, where entry `n - 1`
/// is the citation printed as `[n]`.
pub fn standardize_citations(text: &str) -> (String, Vec<String>) {
    let mut numbering: HashMap<String, usize> = HashMap::new();
    let mut bibliography: Vec<String> = Vec::new();

    let rewritten = INLINE_CITATION.replace_all(text, |caps: &Captures| {
        let citation = format!("{}, {}", caps[1].trim(), &caps[2]);
        let number = *numbering.entry(citation.clone()).or_insert_with(|| {
            bibliography.push(citation);
            bibliography.len()
        });
        format!("[{}]", number)
    });

    (rewritten.into_owned(), bibliography)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_seen_numbering() {
        let text = "Plasticity (Hebb, 1949) was refined (Bliss et al., 1973) and again (Hebb, 1949).";

        let (rewritten, bibliography) = standardize_citations(text);

        assert_eq!(rewritten, "Plasticity [1] was refined [2] and again [1].");
        assert_eq!(bibliography, vec!["Hebb, 1949", "Bliss et al., 1973"]);
    }

    #[test]
    fn test_spacing_variants_share_a_number() {
        let (rewritten, bibliography) = standardize_citations("(Kandel,2001) and (Kandel, 2001)");

        assert_eq!(rewritten, "[1] and [1]");
        assert_eq!(bibliography.len(), 1);
    }

    #[test]
    fn test_rewritten_text_is_stable() {
        let (once, _) = standardize_citations("A claim (Squire, 1992) holds (Milner, 1957).");
        let (twice, bibliography) = standardize_citations(&once);

        assert_eq!(once, twice);
        assert!(bibliography.is_empty());
    }

    #[test]
    fn test_non_citations_untouched() {
        let text = "values (n = 12, 2020 samples) and (see below, 1999a) stay";
        let (rewritten, bibliography) = standardize_citations(text);

        assert_eq!(rewritten, text);
        assert!(bibliography.is_empty());
    }
}

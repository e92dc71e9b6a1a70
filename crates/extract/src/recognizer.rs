//! Dictionary-driven entity recognition.
//!
//! The recognizer is the pluggable half of the linguistic extraction policy:
//! anything that can turn a sentence into labelled spans can drive it.

use aho_corasick::{AhoCorasick, MatchKind};
use anyhow::{Context, Result};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use tracing::info;

/// Label given to terms taken from the deep document glossary.
pub const CONCEPT_LABEL: &str = "CONCEPT";

#[derive(Debug, Clone, PartialEq)]
pub struct RecognizedSpan {
    pub text: String,
    pub label: String,
    pub start: usize,
    pub end: usize,
}

pub trait EntityRecognizer: Send + Sync {
    /// Spans in `text`, in order of appearance, non-overlapping.
    fn recognize(&self, text: &str) -> Vec<RecognizedSpan>;
}

/// Aho-Corasick matcher over a term list; ASCII case-insensitive, whole
/// words only. Among whole-word matches the leftmost wins, then the longest.
pub struct GazetteerRecognizer {
    automaton: AhoCorasick,
    labels: Vec<String>,
}

impl GazetteerRecognizer {
    pub fn new<I, T, L>(terms: I) -> Result<Self>
    where
        I: IntoIterator<Item = (T, L)>,
        T: AsRef<str>,
        L: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut patterns = Vec::new();
        let mut labels = Vec::new();

        for (term, label) in terms {
            let term = term.as_ref().trim();
            if term.is_empty() || !seen.insert(term.to_lowercase()) {
                continue;
            }
            patterns.push(term.to_string());
            labels.push(label.as_ref().trim().to_uppercase());
        }

        let automaton = AhoCorasick::builder()
            .match_kind(MatchKind::Standard)
            .ascii_case_insensitive(true)
            .build(&patterns)
            .context("Failed to build gazetteer automaton")?;

        info!(terms = patterns.len(), "Gazetteer recognizer built");

        Ok(Self { automaton, labels })
    }

    /// Every glossary term becomes a `CONCEPT`.
    pub fn from_glossary(dictionary: &BTreeMap<String, String>) -> Result<Self> {
        Self::new(dictionary.keys().map(|term| (term.as_str(), CONCEPT_LABEL)))
    }

    /// One `term<TAB>LABEL` per line; blank lines and `#` comments are
    /// ignored, a missing label means `CONCEPT`.
    pub fn from_tsv_str(content: &str) -> Result<Self> {
        let terms: Vec<(String, String)> = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(|line| match line.split_once('\t') {
                Some((term, label)) if !label.trim().is_empty() => {
                    (term.to_string(), label.to_string())
                }
                Some((term, _)) => (term.to_string(), CONCEPT_LABEL.to_string()),
                None => (line.to_string(), CONCEPT_LABEL.to_string()),
            })
            .collect();

        Self::new(terms)
    }

    pub fn from_tsv(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read term list: {:?}", path))?;
        Self::from_tsv_str(&content)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl EntityRecognizer for GazetteerRecognizer {
    fn recognize(&self, text: &str) -> Vec<RecognizedSpan> {
        // Boundary check first, so a longer term cut mid-word cannot hide a
        // shorter one starting at the same offset.
        let mut candidates: Vec<_> = self
            .automaton
            .find_overlapping_iter(text)
            .filter(|m| is_word_boundary(text, m.start(), m.end()))
            .collect();
        candidates.sort_by_key(|m| (m.start(), std::cmp::Reverse(m.end())));

        let mut spans = Vec::new();
        let mut covered = 0;
        for m in candidates {
            if m.start() < covered {
                continue;
            }
            covered = m.end();
            spans.push(RecognizedSpan {
                text: text[m.start()..m.end()].to_string(),
                label: self.labels[m.pattern().as_usize()].clone(),
                start: m.start(),
                end: m.end(),
            });
        }
        spans
    }
}

fn is_word_boundary(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
}

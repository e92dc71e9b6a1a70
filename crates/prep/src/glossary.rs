use extract::TextGenerator;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::LazyLock;
use tracing::{info, warn};

use crate::prompt::build_glossary_prompt;

static LIST_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[-*•]\s*|\d+[.)]\s*)").expect("list marker pattern is valid")
});

/// What happened while building the glossary. Nothing in here is fatal.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GlossaryReport {
    pub keywords: Vec<String>,
    pub defined: usize,
    /// Response lines that could not be split into term and definition.
    pub skipped_lines: Vec<String>,
    pub generation_error: Option<String>,
}

/// Split a generated response into `term -> definition` pairs.
///
/// Each line is split at its first en-dash or colon. Lines without a
/// delimiter or with an empty side are returned as skipped.
pub fn parse_definitions(response: &str) -> (BTreeMap<String, String>, Vec<String>) {
    let mut definitions = BTreeMap::new();
    let mut skipped = Vec::new();

    for line in response.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let line_body = LIST_MARKER.replace(line, "");

        let Some(split_at) = line_body.find(['–', ':']) else {
            skipped.push(line.to_string());
            continue;
        };
        let delimiter_len = line_body[split_at..].chars().next().map_or(1, char::len_utf8);

        let term = clean_term(&line_body[..split_at]);
        let definition = line_body[split_at + delimiter_len..].trim();

        if term.is_empty() || definition.is_empty() {
            skipped.push(line.to_string());
            continue;
        }

        definitions.insert(term, definition.to_string());
    }

    (definitions, skipped)
}

fn clean_term(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c: char| c == '*' || c == '"' || c == '`')
        .trim()
        .to_lowercase()
}

/// Ask the generator for definitions of all keywords in one request.
///
/// A failed call leaves the glossary empty and is recorded in the report.
pub async fn build_glossary(
    generator: &dyn TextGenerator,
    keywords: Vec<String>,
) -> (BTreeMap<String, String>, GlossaryReport) {
    let mut report = GlossaryReport {
        keywords,
        ..Default::default()
    };

    if report.keywords.is_empty() {
        return (BTreeMap::new(), report);
    }

    let prompt = build_glossary_prompt(&report.keywords);
    let response = match generator.generate(&prompt).await {
        Ok(response) => response,
        Err(e) => {
            warn!(error = %format!("{:#}", e), "Glossary generation failed, continuing without definitions");
            report.generation_error = Some(format!("{:#}", e));
            return (BTreeMap::new(), report);
        }
    };

    let (definitions, skipped) = parse_definitions(&response);
    if !skipped.is_empty() {
        warn!(skipped = skipped.len(), "Skipped malformed glossary lines");
    }

    report.defined = definitions.len();
    report.skipped_lines = skipped;
    info!(
        keywords = report.keywords.len(),
        defined = report.defined,
        "Glossary built"
    );

    (definitions, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;

    struct Canned(&'static str);

    #[async_trait]
    impl TextGenerator for Canned {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct Unreachable;

    #[async_trait]
    impl TextGenerator for Unreachable {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            anyhow::bail!("connection refused")
        }
    }

    #[test]
    fn test_parse_en_dash_and_colon() {
        let (definitions, skipped) = parse_definitions(
            "Dopamine – a neurotransmitter\nhippocampus: a brain region\n\n1. LTP: lasting synaptic strengthening",
        );

        assert!(skipped.is_empty());
        assert_eq!(definitions["dopamine"], "a neurotransmitter");
        assert_eq!(definitions["hippocampus"], "a brain region");
        assert_eq!(definitions["ltp"], "lasting synaptic strengthening");
    }

    #[test]
    fn test_split_at_first_delimiter_only() {
        let (definitions, _) = parse_definitions("ratio: defined as a:b – in short");
        assert_eq!(definitions["ratio"], "defined as a:b – in short");
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let (definitions, skipped) = parse_definitions(
            "Here are your definitions\n**Cortex** – outer layer\n: orphan definition\nneuron –",
        );

        assert_eq!(definitions.len(), 1);
        assert_eq!(definitions["cortex"], "outer layer");
        assert_eq!(skipped.len(), 3);
    }

    #[tokio::test]
    async fn test_build_glossary_reports_counts() {
        let generator = Canned("dopamine – a neurotransmitter\nnot a definition");

        let (definitions, report) =
            build_glossary(&generator, vec!["dopamine".into(), "serotonin".into()]).await;

        assert_eq!(definitions.len(), 1);
        assert_eq!(report.defined, 1);
        assert_eq!(report.skipped_lines, vec!["not a definition"]);
        assert!(report.generation_error.is_none());
    }

    #[tokio::test]
    async fn test_generation_failure_degrades_to_empty() {
        let (definitions, report) = build_glossary(&Unreachable, vec!["cortex".into()]).await;

        assert!(definitions.is_empty());
        assert!(report.generation_error.unwrap().contains("connection refused"));
    }
}

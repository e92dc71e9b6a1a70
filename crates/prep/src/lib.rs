pub mod citations;
pub mod glossary;
pub mod keywords;
pub mod prompt;
pub mod sections;

pub use citations::standardize_citations;
pub use glossary::{build_glossary, parse_definitions, GlossaryReport};
pub use keywords::{KeywordRanker, RankedKeyword};
pub use sections::{detect_sections, DEFAULT_HEADER_PATTERN};

use anyhow::{Context, Result};
use extract::{DeepDocument, TextGenerator};
use ingest::ExtractedText;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

pub const DEEP_DOCUMENT_JSON: &str = "deep_document.json";
pub const DEEP_DOCUMENT_TXT: &str = "deep_document.txt";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrepConfig {
    pub title: String,
    pub header_pattern: String,
    pub glossary_top_k: usize,
    pub max_phrase_words: usize,
}

impl Default for PrepConfig {
    fn default() -> Self {
        Self {
            title: "Deep Document".to_string(),
            header_pattern: DEFAULT_HEADER_PATTERN.to_string(),
            glossary_top_k: 20,
            max_phrase_words: 3,
        }
    }
}

/// Result of one normalization run.
#[derive(Debug, Clone)]
pub struct PrepOutcome {
    pub document: DeepDocument,
    /// Full text with citations rewritten to `[n]`.
    pub body: String,
    pub glossary: GlossaryReport,
}

#[derive(Debug, Clone)]
pub struct PrepArtifacts {
    pub document: PathBuf,
    pub body: PathBuf,
}

impl PrepOutcome {
    /// Write `deep_document.json` and `deep_document.txt` into `dir`.
    pub async fn persist(&self, dir: &Path) -> Result<PrepArtifacts> {
        tokio::fs::create_dir_all(dir)
            .await
            .context(format!("Failed to create {:?}", dir))?;

        let artifacts = PrepArtifacts {
            document: dir.join(DEEP_DOCUMENT_JSON),
            body: dir.join(DEEP_DOCUMENT_TXT),
        };

        self.document.save(&artifacts.document).await?;
        tokio::fs::write(&artifacts.body, &self.body)
            .await
            .context(format!("Failed to write {:?}", artifacts.body))?;

        Ok(artifacts)
    }
}

/// Turns decoded uploads into a deep document.
pub struct DocumentPrepper {
    config: PrepConfig,
    header: Regex,
    ranker: KeywordRanker,
    generator: Option<Arc<dyn TextGenerator>>,
}

impl DocumentPrepper {
    /// Without a generator the glossary is skipped and left empty.
    pub fn new(config: PrepConfig, generator: Option<Arc<dyn TextGenerator>>) -> Result<Self> {
        let header = Regex::new(&config.header_pattern)
            .context(format!("Invalid header pattern: {}", config.header_pattern))?;
        let ranker = KeywordRanker::new(config.max_phrase_words);

        Ok(Self {
            config,
            header,
            ranker,
            generator,
        })
    }

    pub async fn run(&self, texts: &[ExtractedText]) -> PrepOutcome {
        let raw = texts
            .iter()
            .map(|t| t.text.as_str())
            .filter(|t| !t.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");

        let (body, bibliography) = standardize_citations(&raw);
        let sections = detect_sections(&body, &self.header);

        let keywords: Vec<String> = self
            .ranker
            .rank(&body, self.config.glossary_top_k)
            .into_iter()
            .map(|k| k.phrase)
            .collect();

        let (dictionary, glossary) = match &self.generator {
            Some(generator) => build_glossary(generator.as_ref(), keywords).await,
            None => (
                Default::default(),
                GlossaryReport {
                    keywords,
                    ..Default::default()
                },
            ),
        };

        let document = DeepDocument {
            title: self.config.title.clone(),
            sections,
            dictionary,
            bibliography,
        };

        info!(
            inputs = texts.len(),
            sections = document.sections.len(),
            terms = document.dictionary.len(),
            citations = document.bibliography.len(),
            "Deep document created"
        );

        PrepOutcome {
            document,
            body,
            glossary,
        }
    }
}

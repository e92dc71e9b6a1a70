use anyhow::{Context, Result};
use extract::export::{ALIASES_JSON, EDGES_CSV, ENTITIES_CSV};
use extract::{
    DeepDocument, Edge, Entity, Extractor, GazetteerRecognizer, LinguisticPolicy, OllamaClient,
    RetryPolicy, TextGenerator,
};
use index::{GraphLoader, GraphStore, LoadReport, Neo4jStore};
use ingest::{ExtractedText, UploadedFile};
use prep::{DocumentPrepper, GlossaryReport, DEEP_DOCUMENT_JSON, DEEP_DOCUMENT_TXT};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::config::AppConfig;

/// Files a run leaves in the output directory, in the order they are written.
pub const ARTIFACTS: [&str; 5] = [
    DEEP_DOCUMENT_JSON,
    DEEP_DOCUMENT_TXT,
    ENTITIES_CSV,
    EDGES_CSV,
    ALIASES_JSON,
];

const PREVIEW_ROWS: usize = 5;

/// Which extraction strategy a run uses.
#[derive(Debug, Clone, PartialEq)]
pub enum PolicyChoice {
    Naive,
    /// Recognize terms from a `term<TAB>label` file, or from the run's own
    /// glossary when no file is given.
    Gazetteer { terms: Option<PathBuf> },
}

impl PolicyChoice {
    pub fn from_name(name: &str, terms: Option<PathBuf>) -> Result<Self> {
        match name.trim().to_lowercase().as_str() {
            "naive" => Ok(Self::Naive),
            "gazetteer" | "linguistic" => Ok(Self::Gazetteer { terms }),
            other => anyhow::bail!("Unknown extraction policy: {}", other),
        }
    }
}

/// Path of a known artifact inside `output_dir`; `None` for anything else.
pub fn artifact_path(output_dir: &Path, name: &str) -> Option<PathBuf> {
    ARTIFACTS.contains(&name).then(|| output_dir.join(name))
}

#[derive(Debug, Clone, Serialize)]
pub struct DegradedFile {
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Preview {
    pub entities: Vec<Entity>,
    pub edges: Vec<Edge>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineSummary {
    pub files: usize,
    pub degraded: Vec<DegradedFile>,
    pub sections: usize,
    pub citations: usize,
    pub glossary_terms: usize,
    pub glossary: GlossaryReport,
    pub policy: &'static str,
    pub entities: usize,
    pub edges: usize,
    pub aliases: usize,
    pub preview: Preview,
}

/// Ingest, prep and extraction over one batch of uploads. Every stage reads
/// the previous stage's artifact from the output directory.
pub struct Pipeline {
    prepper: DocumentPrepper,
    policy: PolicyChoice,
    output_dir: PathBuf,
}

impl Pipeline {
    pub fn new(
        config: &AppConfig,
        generator: Option<Arc<dyn TextGenerator>>,
        policy: PolicyChoice,
    ) -> Result<Self> {
        let prepper = DocumentPrepper::new(config.prep.clone(), generator)?;

        Ok(Self {
            prepper,
            policy,
            output_dir: config.output_dir.clone(),
        })
    }

    /// Uses the configured generation service for the glossary, if enabled.
    pub fn from_config(config: &AppConfig, policy: PolicyChoice) -> Result<Self> {
        Self::new(config, generator(config)?, policy)
    }

    pub fn artifact_path(&self, name: &str) -> Option<PathBuf> {
        artifact_path(&self.output_dir, name)
    }

    pub async fn process(&self, files: &[UploadedFile]) -> Result<PipelineSummary> {
        let texts = ingest::extract_batch(files);
        self.process_texts(texts).await
    }

    pub async fn process_directory(&self, dir: &Path) -> Result<PipelineSummary> {
        let texts = ingest::ingest_directory(dir).await?;
        self.process_texts(texts).await
    }

    async fn process_texts(&self, texts: Vec<ExtractedText>) -> Result<PipelineSummary> {
        let degraded: Vec<DegradedFile> = texts
            .iter()
            .filter_map(|t| {
                t.degraded.as_ref().map(|reason| DegradedFile {
                    name: t.name.clone(),
                    reason: reason.clone(),
                })
            })
            .collect();

        let outcome = self.prepper.run(&texts).await;
        let prepared = outcome.persist(&self.output_dir).await?;

        let document = DeepDocument::load(&prepared.document).await?;
        let extractor = self.extractor(&document.dictionary)?;
        let extraction = extractor.run(&document);
        extraction.persist(&self.output_dir)?;

        info!(
            output = %self.output_dir.display(),
            files = texts.len(),
            degraded = degraded.len(),
            entities = extraction.entities.len(),
            edges = extraction.edges.len(),
            "Pipeline run finished"
        );

        Ok(PipelineSummary {
            files: texts.len(),
            degraded,
            sections: document.sections.len(),
            citations: document.bibliography.len(),
            glossary_terms: document.dictionary.len(),
            glossary: outcome.glossary,
            policy: extractor.policy_name(),
            entities: extraction.entities.len(),
            edges: extraction.edges.len(),
            aliases: extraction.aliases.len(),
            preview: Preview {
                entities: extraction.entities.iter().take(PREVIEW_ROWS).cloned().collect(),
                edges: extraction.edges.iter().take(PREVIEW_ROWS).cloned().collect(),
            },
        })
    }

    fn extractor(&self, dictionary: &BTreeMap<String, String>) -> Result<Extractor> {
        match &self.policy {
            PolicyChoice::Naive => Ok(Extractor::naive()),
            PolicyChoice::Gazetteer { terms: Some(path) } => {
                let recognizer = GazetteerRecognizer::from_tsv(path)?;
                Ok(Extractor::new(LinguisticPolicy::new(recognizer)))
            }
            PolicyChoice::Gazetteer { terms: None } => {
                let recognizer = GazetteerRecognizer::from_glossary(dictionary)?;
                Ok(Extractor::new(LinguisticPolicy::new(recognizer)))
            }
        }
    }
}

pub fn generator(config: &AppConfig) -> Result<Option<Arc<dyn TextGenerator>>> {
    if !config.glossary_enabled {
        return Ok(None);
    }

    let client = OllamaClient::new(&config.generation, RetryPolicy::from_config(&config.retry))?;
    Ok(Some(Arc::new(client)))
}

/// Connect to Neo4j with the configured credentials. Fails without them.
pub async fn connect_graph(config: &AppConfig) -> Result<Neo4jStore> {
    let graph = config.graph_config()?;
    Neo4jStore::connect(&graph, RetryPolicy::from_config(&config.retry)).await
}

/// Load the CSV artifacts in `dir` into `store`.
pub async fn load_artifacts<S: GraphStore>(
    store: S,
    config: &AppConfig,
    dir: &Path,
) -> Result<LoadReport> {
    GraphLoader::new(store, config.loader.clone())
        .load_artifacts(dir)
        .await
        .context(format!("Graph load from {:?} failed", dir))
}

pub fn content_type(artifact: &str) -> &'static str {
    if artifact.ends_with(".json") {
        "application/json"
    } else if artifact.ends_with(".csv") {
        "text/csv; charset=utf-8"
    } else {
        "text/plain; charset=utf-8"
    }
}

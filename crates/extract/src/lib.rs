pub mod export;
pub mod llm;
pub mod normalizer;
pub mod policy;
pub mod recognizer;
pub mod retry;
pub mod schema;

pub use export::ExtractionArtifacts;
pub use llm::{GenerationConfig, OllamaClient, TextGenerator};
pub use normalizer::AliasSet;
pub use policy::{ExtractionPolicy, LinguisticPolicy, NaiveTokenPolicy};
pub use recognizer::{EntityRecognizer, GazetteerRecognizer};
pub use retry::{RetryConfig, RetryPolicy};
pub use schema::{DeepDocument, Edge, Entity, Extraction, Section};

use anyhow::Result;
use std::path::Path;
use tracing::info;

pub struct Extractor {
    policy: Box<dyn ExtractionPolicy>,
}

impl Extractor {
    pub fn new(policy: impl ExtractionPolicy + 'static) -> Self {
        Self {
            policy: Box::new(policy),
        }
    }

    pub fn naive() -> Self {
        Self::new(NaiveTokenPolicy::default())
    }

    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    /// Extract entities and co-occurrence edges from every section, in
    /// section order.
    pub fn run(&self, document: &DeepDocument) -> Extraction {
        let mut extraction = Extraction {
            labelled: self.policy.labels_entities(),
            ..Default::default()
        };

        for section in &document.sections {
            let found = self.policy.extract_section(section, &mut extraction.aliases);
            extraction.entities.extend(found.entities);
            extraction.edges.extend(found.edges);
        }

        info!(
            policy = self.policy.name(),
            sections = document.sections.len(),
            entities = extraction.entities.len(),
            edges = extraction.edges.len(),
            "Extraction finished"
        );

        extraction
    }

    /// Read the deep document back from disk and extract from it.
    pub async fn run_from_file(&self, path: &Path) -> Result<Extraction> {
        let document = DeepDocument::load(path).await?;
        Ok(self.run(&document))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(sections: &[&str]) -> DeepDocument {
        DeepDocument {
            title: "Deep Document".into(),
            sections: sections
                .iter()
                .map(|content| Section::new("Heading".into(), 1, content.to_string()))
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_entities_not_merged_across_sections() {
        let doc = document(&["neurons fire quickly", "neurons rest"]);

        let extraction = Extractor::naive().run(&doc);

        let neurons: Vec<_> = extraction
            .entities
            .iter()
            .filter(|e| e.id == "neurons")
            .collect();
        assert_eq!(neurons.len(), 2);
        assert_ne!(neurons[0].section_id, neurons[1].section_id);
        assert!(!extraction.labelled);
        // "neurons fire quickly": neurons -> quickly; "neurons rest": nothing.
        assert_eq!(extraction.edges.len(), 1);
    }

    #[test]
    fn test_glossary_driven_linguistic_run() {
        let mut doc = document(&["Synaptic plasticity depends on calcium signalling."]);
        doc.dictionary.insert("synaptic plasticity".into(), "change in synapse strength".into());
        doc.dictionary.insert("calcium".into(), "an ion".into());

        let recognizer = GazetteerRecognizer::from_glossary(&doc.dictionary).unwrap();
        let extraction = Extractor::new(LinguisticPolicy::new(recognizer)).run(&doc);

        assert!(extraction.labelled);
        let ids: Vec<_> = extraction.entities.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["synaptic plasticity_CONCEPT", "calcium_CONCEPT"]);
        assert_eq!(extraction.edges.len(), 1);
    }

    #[tokio::test]
    async fn test_run_from_serialized_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deep_document.json");
        document(&["alpha beta gamma delta"]).save(&path).await.unwrap();

        let extraction = Extractor::naive().run_from_file(&path).await.unwrap();

        assert_eq!(extraction.entities.len(), 3);
        assert_eq!(extraction.edges.len(), 2);
    }
}

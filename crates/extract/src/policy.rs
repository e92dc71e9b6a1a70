use std::collections::HashSet;
use unicode_segmentation::UnicodeSegmentation;

use crate::normalizer::AliasSet;
use crate::recognizer::EntityRecognizer;
use crate::schema::{Edge, Entity, Section};

#[derive(Debug, Clone, Default)]
pub struct SectionExtraction {
    pub entities: Vec<Entity>,
    pub edges: Vec<Edge>,
}

/// One way of turning a section into entities and co-occurrence edges.
pub trait ExtractionPolicy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether entities produced by this policy carry a type label.
    fn labels_entities(&self) -> bool;

    fn extract_section(&self, section: &Section, aliases: &mut AliasSet) -> SectionExtraction;
}

/// Every alphabetic token of at least `min_chars` characters is an entity;
/// consecutive entities are linked in extraction order.
///
/// Low fidelity on purpose: it needs no model at all.
#[derive(Debug, Clone)]
pub struct NaiveTokenPolicy {
    min_chars: usize,
}

impl NaiveTokenPolicy {
    pub fn new(min_chars: usize) -> Self {
        Self { min_chars }
    }
}

impl Default for NaiveTokenPolicy {
    fn default() -> Self {
        Self::new(5)
    }
}

impl ExtractionPolicy for NaiveTokenPolicy {
    fn name(&self) -> &'static str {
        "naive"
    }

    fn labels_entities(&self) -> bool {
        false
    }

    fn extract_section(&self, section: &Section, aliases: &mut AliasSet) -> SectionExtraction {
        let mut seen = HashSet::new();
        let mut entities = Vec::new();

        let tokens = section
            .content
            .split(|c: char| !c.is_alphabetic())
            .filter(|token| token.chars().count() >= self.min_chars);

        for token in tokens {
            let id = aliases.record(token);
            if seen.insert(id.clone()) {
                entities.push(Entity {
                    id,
                    name: token.to_string(),
                    label: None,
                    section_id: section.id.clone(),
                });
            }
        }

        let edges = entities
            .windows(2)
            .map(|pair| Edge {
                source: pair[0].id.clone(),
                target: pair[1].id.clone(),
                section_id: section.id.clone(),
            })
            .collect();

        SectionExtraction { entities, edges }
    }
}

/// Recognizer-driven extraction: labelled entities, edges only between
/// entities found in the same sentence.
pub struct LinguisticPolicy<R> {
    recognizer: R,
}

impl<R: EntityRecognizer> LinguisticPolicy<R> {
    pub fn new(recognizer: R) -> Self {
        Self { recognizer }
    }
}

impl<R: EntityRecognizer> ExtractionPolicy for LinguisticPolicy<R> {
    fn name(&self) -> &'static str {
        "linguistic"
    }

    fn labels_entities(&self) -> bool {
        true
    }

    fn extract_section(&self, section: &Section, aliases: &mut AliasSet) -> SectionExtraction {
        let mut result = SectionExtraction::default();
        let mut seen_entities = HashSet::new();
        let mut seen_pairs = HashSet::new();

        for sentence in section.content.unicode_sentences() {
            let mut in_sentence: Vec<String> = Vec::new();

            for span in self.recognizer.recognize(sentence) {
                let key = aliases.record(&span.text);
                let id = format!("{}_{}", key, span.label);

                if seen_entities.insert(id.clone()) {
                    result.entities.push(Entity {
                        id: id.clone(),
                        name: span.text.clone(),
                        label: Some(span.label.clone()),
                        section_id: section.id.clone(),
                    });
                }
                if !in_sentence.contains(&id) {
                    in_sentence.push(id);
                }
            }

            for (i, source) in in_sentence.iter().enumerate() {
                for target in &in_sentence[i + 1..] {
                    // Co-occurrence is symmetric: one edge per unordered pair.
                    let pair = if source < target {
                        (source.clone(), target.clone())
                    } else {
                        (target.clone(), source.clone())
                    };
                    if seen_pairs.insert(pair) {
                        result.edges.push(Edge {
                            source: source.clone(),
                            target: target.clone(),
                            section_id: section.id.clone(),
                        });
                    }
                }
            }
        }

        result
    }
}

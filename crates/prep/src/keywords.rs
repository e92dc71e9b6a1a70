//! Statistical keyword ranking (RAKE).
//!
//! Candidate phrases are runs of content words between stop words, line
//! breaks and punctuation. Runs longer than the phrase cap are cut into
//! consecutive pieces. Each word scores degree / frequency, where degree counts the
//! words it shares phrases with (itself included); a phrase scores the sum
//! of its words.

use std::collections::{HashMap, HashSet};

const STOPWORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "also", "am", "an", "and", "any",
    "are", "as", "at", "be", "because", "been", "before", "being", "below", "between", "both",
    "but", "by", "can", "could", "did", "do", "does", "doing", "down", "during", "each", "et",
    "al", "etc", "few", "for", "from", "further", "had", "has", "have", "having", "he", "her",
    "here", "hers", "him", "his", "how", "however", "i", "if", "in", "into", "is", "it", "its",
    "itself", "just", "may", "me", "might", "more", "most", "must", "my", "no", "nor", "not",
    "now", "of", "off", "on", "once", "only", "or", "other", "our", "ours", "out", "over", "own",
    "same", "she", "should", "so", "some", "such", "than", "that", "the", "their", "theirs",
    "them", "then", "there", "these", "they", "this", "those", "through", "thus", "to", "too",
    "under", "until", "up", "upon", "us", "very", "was", "we", "were", "what", "when", "where",
    "which", "while", "who", "whom", "why", "will", "with", "within", "without", "would", "you",
    "your", "yours",
];

#[derive(Debug, Clone, PartialEq)]
pub struct RankedKeyword {
    pub phrase: String,
    pub score: f64,
}

pub struct KeywordRanker {
    stopwords: HashSet<&'static str>,
    max_phrase_words: usize,
}

impl KeywordRanker {
    pub fn new(max_phrase_words: usize) -> Self {
        Self {
            stopwords: STOPWORDS.iter().copied().collect(),
            max_phrase_words: max_phrase_words.max(1),
        }
    }

    /// Top `top_k` phrases, best first; equal scores keep first-appearance
    /// order.
    pub fn rank(&self, text: &str, top_k: usize) -> Vec<RankedKeyword> {
        let phrases = self.candidate_phrases(text);

        let mut frequency: HashMap<&str, f64> = HashMap::new();
        let mut degree: HashMap<&str, f64> = HashMap::new();
        for phrase in &phrases {
            for word in phrase {
                *frequency.entry(word.as_str()).or_default() += 1.0;
                *degree.entry(word.as_str()).or_default() += phrase.len() as f64;
            }
        }

        let mut seen = HashSet::new();
        let mut ranked: Vec<RankedKeyword> = Vec::new();
        for phrase in &phrases {
            let joined = phrase.join(" ");
            if !seen.insert(joined.clone()) {
                continue;
            }
            let score = phrase
                .iter()
                .map(|w| degree[w.as_str()] / frequency[w.as_str()])
                .sum();
            ranked.push(RankedKeyword { phrase: joined, score });
        }

        // Stable sort keeps first-appearance order among ties.
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        ranked.truncate(top_k);
        ranked
    }

    fn candidate_phrases(&self, text: &str) -> Vec<Vec<String>> {
        let mut phrases = Vec::new();

        let fragments = text.lines().flat_map(|line| {
            line.split(|c: char| !(c.is_alphanumeric() || c.is_whitespace() || c == '-' || c == '\''))
        });

        for fragment in fragments {
            let mut current: Vec<String> = Vec::new();

            for raw in fragment.split_whitespace() {
                let word = raw.trim_matches(|c: char| c == '-' || c == '\'').to_lowercase();
                let is_delimiter = word.chars().count() < 2
                    || word.chars().all(|c| c.is_numeric())
                    || self.stopwords.contains(word.as_str());

                if is_delimiter {
                    self.push_phrase(&mut phrases, &mut current);
                } else {
                    current.push(word);
                }
            }
            self.push_phrase(&mut phrases, &mut current);
        }

        phrases
    }

    fn push_phrase(&self, phrases: &mut Vec<Vec<String>>, current: &mut Vec<String>) {
        phrases.extend(current.chunks(self.max_phrase_words).map(<[String]>::to_vec));
        current.clear();
    }
}

impl Default for KeywordRanker {
    fn default() -> Self {
        Self::new(3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiword_phrases_outrank_single_words() {
        let text = "Long term potentiation of synapses is strong. \
                    Long term potentiation is studied in receptors. Receptors matter.";

        let ranked = KeywordRanker::default().rank(text, 3);

        assert_eq!(ranked[0].phrase, "long term potentiation");
        assert!(ranked[0].score > ranked[1].score);
        assert!(ranked.iter().any(|k| k.phrase == "receptors"));
    }

    #[test]
    fn test_stopwords_numbers_and_citations_split_phrases() {
        let text = "The hippocampus [1] and the amygdala in 2020";

        let phrases: Vec<_> = KeywordRanker::default()
            .rank(text, 10)
            .into_iter()
            .map(|k| k.phrase)
            .collect();

        assert_eq!(phrases, vec!["hippocampus", "amygdala"]);
    }

    #[test]
    fn test_top_k_and_empty_input() {
        let ranker = KeywordRanker::default();
        assert!(ranker.rank("", 5).is_empty());
        assert!(ranker.rank("the and of", 5).is_empty());
        assert_eq!(ranker.rank("alpha. beta. gamma. delta.", 2).len(), 2);
    }

    #[test]
    fn test_overlong_runs_are_split() {
        let phrases: Vec<_> = KeywordRanker::new(2)
            .rank("very large cortical neuron populations", 5)
            .into_iter()
            .map(|k| k.phrase)
            .collect();

        assert_eq!(phrases.len(), 2);
        assert!(phrases.contains(&"large cortical".to_string()));
        assert!(phrases.contains(&"neuron populations".to_string()));
    }

    #[test]
    fn test_line_breaks_separate_header_from_content() {
        let phrases: Vec<_> = KeywordRanker::default()
            .rank("Introduction\nSynaptic plasticity matters", 5)
            .into_iter()
            .map(|k| k.phrase)
            .collect();

        assert_eq!(phrases, vec!["synaptic plasticity matters", "introduction"]);
    }
}

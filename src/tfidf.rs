// src/tfidf.rs
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::OnceLock;

/// English stop words dropped from category and ingredient text.
const ENGLISH_STOP_WORDS: &[&str] = &[
    "a", "about", "above", "across", "after", "afterwards", "again", "against", "all", "almost",
    "alone", "along", "already", "also", "although", "always", "am", "among", "amongst", "an",
    "and", "another", "any", "anyhow", "anyone", "anything", "anyway", "anywhere", "are",
    "around", "as", "at", "back", "be", "became", "because", "become", "becomes", "becoming",
    "been", "before", "beforehand", "behind", "being", "below", "beside", "besides", "between",
    "beyond", "both", "but", "by", "can", "cannot", "could", "do", "done", "down", "due",
    "during", "each", "eg", "either", "else", "elsewhere", "enough", "etc", "even", "ever",
    "every", "everyone", "everything", "everywhere", "except", "few", "for", "former",
    "formerly", "from", "further", "had", "has", "have", "he", "hence", "her", "here",
    "hereafter", "hereby", "herein", "hers", "herself", "him", "himself", "his", "how",
    "however", "i", "ie", "if", "in", "indeed", "into", "is", "it", "its", "itself", "last",
    "latter", "least", "less", "ltd", "many", "may", "me", "meanwhile", "might", "mine", "more",
    "moreover", "most", "mostly", "much", "must", "my", "myself", "namely", "neither", "never",
    "nevertheless", "next", "no", "nobody", "none", "noone", "nor", "not", "nothing", "now",
    "nowhere", "of", "off", "often", "on", "once", "one", "only", "onto", "or", "other",
    "others", "otherwise", "our", "ours", "ourselves", "out", "over", "own", "per", "perhaps",
    "please", "rather", "re", "same", "seem", "seemed", "seeming", "seems", "several", "she",
    "should", "since", "so", "some", "somehow", "someone", "something", "sometime",
    "sometimes", "somewhere", "still", "such", "than", "that", "the", "their", "them",
    "themselves", "then", "thence", "there", "thereafter", "thereby", "therefore", "therein",
    "thereupon", "these", "they", "this", "those", "though", "through", "throughout", "thru",
    "thus", "to", "together", "too", "toward", "towards", "under", "until", "up", "upon", "us",
    "very", "via", "was", "we", "well", "were", "what", "whatever", "when", "whence",
    "whenever", "where", "whereafter", "whereas", "whereby", "wherein", "whereupon",
    "wherever", "whether", "which", "while", "whither", "who", "whoever", "whole", "whom",
    "whose", "why", "will", "with", "within", "without", "would", "yet", "you", "your", "yours",
    "yourself", "yourselves",
];

fn stop_words() -> &'static HashSet<&'static str> {
    static WORDS: OnceLock<HashSet<&'static str>> = OnceLock::new();
    WORDS.get_or_init(|| ENGLISH_STOP_WORDS.iter().copied().collect())
}

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\b\w\w+\b").expect("token pattern is valid"))
}

/// Lowercased tokens of two or more word characters. Commas, spaces and
/// other punctuation all act as separators.
pub fn tokenize(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    token_pattern()
        .find_iter(&lower)
        .map(|m| m.as_str().to_string())
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Weighting {
    /// Raw term counts.
    TermFrequency,
    /// Counts scaled by smoothed inverse document frequency.
    TfIdf,
}

/// L2-normalized sparse row, entries ordered by term index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseVector {
    entries: Vec<(usize, f32)>,
}

impl SparseVector {
    fn normalized(mut entries: Vec<(usize, f32)>) -> Self {
        let norm = entries.iter().map(|(_, w)| w * w).sum::<f32>().sqrt();
        if norm > 0.0 {
            for (_, w) in entries.iter_mut() {
                *w /= norm;
            }
        } else {
            entries.clear();
        }
        Self { entries }
    }

    pub fn is_zero(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> f32 {
        self.entries
            .binary_search_by_key(&index, |(i, _)| *i)
            .map(|pos| self.entries[pos].1)
            .unwrap_or(0.0)
    }

    pub fn dot(&self, other: &SparseVector) -> f32 {
        let (mut i, mut j) = (0, 0);
        let mut sum = 0.0;
        while i < self.entries.len() && j < other.entries.len() {
            let (a_idx, a_w) = self.entries[i];
            let (b_idx, b_w) = other.entries[j];
            match a_idx.cmp(&b_idx) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    sum += a_w * b_w;
                    i += 1;
                    j += 1;
                }
            }
        }
        sum
    }

    /// Cosine similarity. Rows are unit length, so this is the dot product;
    /// a zero vector is similar to nothing.
    pub fn cosine(&self, other: &SparseVector) -> f32 {
        if self.is_zero() || other.is_zero() {
            return 0.0;
        }
        self.dot(other).clamp(-1.0, 1.0)
    }
}

pub struct TfIdf {
    vocab: HashMap<String, usize>,
    idf: Vec<f32>,
    rows: Vec<SparseVector>,
    weighting: Weighting,
    remove_stop_words: bool,
}

pub struct TfIdfBuilder {
    documents: Vec<String>,
    weighting: Weighting,
    remove_stop_words: bool,
}

impl Default for TfIdfBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TfIdfBuilder {
    pub fn new() -> Self {
        Self {
            documents: Vec::new(),
            weighting: Weighting::TfIdf,
            remove_stop_words: true,
        }
    }

    pub fn weighting(mut self, weighting: Weighting) -> Self {
        self.weighting = weighting;
        self
    }

    pub fn remove_stop_words(mut self, remove: bool) -> Self {
        self.remove_stop_words = remove;
        self
    }

    pub fn add(&mut self, document: &str) {
        self.documents.push(document.to_string());
    }

    pub fn build(self) -> TfIdf {
        let tokenized: Vec<Vec<String>> = self
            .documents
            .iter()
            .map(|doc| filtered_tokens(doc, self.remove_stop_words))
            .collect();

        // Vocabulary in lexical order, with document frequencies
        let mut doc_count: BTreeMap<&str, usize> = BTreeMap::new();
        for tokens in &tokenized {
            let unique: BTreeSet<&str> = tokens.iter().map(String::as_str).collect();
            for word in unique {
                *doc_count.entry(word).or_insert(0) += 1;
            }
        }

        let total_docs = tokenized.len() as f32;
        let mut vocab = HashMap::with_capacity(doc_count.len());
        let mut idf = Vec::with_capacity(doc_count.len());
        for (index, (word, count)) in doc_count.iter().enumerate() {
            vocab.insert(word.to_string(), index);
            idf.push(((1.0 + total_docs) / (1.0 + *count as f32)).ln() + 1.0);
        }

        let mut model = TfIdf {
            vocab,
            idf,
            rows: Vec::new(),
            weighting: self.weighting,
            remove_stop_words: self.remove_stop_words,
        };
        let rows = tokenized.iter().map(|tokens| model.vectorize(tokens)).collect();
        model.rows = rows;
        model
    }
}

fn filtered_tokens(text: &str, remove_stop_words: bool) -> Vec<String> {
    tokenize(text)
        .into_iter()
        .filter(|t| !remove_stop_words || !stop_words().contains(t.as_str()))
        .collect()
}

impl TfIdf {
    fn vectorize(&self, tokens: &[String]) -> SparseVector {
        let mut counts: BTreeMap<usize, f32> = BTreeMap::new();
        for token in tokens {
            if let Some(&index) = self.vocab.get(token) {
                *counts.entry(index).or_insert(0.0) += 1.0;
            }
        }
        let entries = counts
            .into_iter()
            .map(|(index, count)| match self.weighting {
                Weighting::TermFrequency => (index, count),
                Weighting::TfIdf => (index, count * self.idf[index]),
            })
            .collect();
        SparseVector::normalized(entries)
    }

    /// Vector for text outside the corpus; unknown terms are ignored.
    pub fn transform(&self, text: &str) -> SparseVector {
        self.vectorize(&filtered_tokens(text, self.remove_stop_words))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn vocab_len(&self) -> usize {
        self.vocab.len()
    }

    pub fn row(&self, index: usize) -> Option<&SparseVector> {
        self.rows.get(index)
    }

    /// Weight of `term` in corpus row `index`.
    pub fn weight(&self, index: usize, term: &str) -> f32 {
        match (self.rows.get(index), self.vocab.get(&term.to_lowercase())) {
            (Some(row), Some(&term_index)) => row.get(term_index),
            _ => 0.0,
        }
    }

    /// Cosine similarity of row `index` against every row, in row order.
    pub fn similarities(&self, index: usize) -> Vec<f32> {
        match self.rows.get(index) {
            Some(anchor) => self.rows.iter().map(|row| anchor.cosine(row)).collect(),
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(docs: &[&str]) -> TfIdf {
        let mut builder = TfIdfBuilder::new();
        for doc in docs {
            builder.add(doc);
        }
        builder.build()
    }

    #[test]
    fn tokenizer_splits_on_commas_and_drops_single_chars() {
        assert_eq!(tokenize("Italian,Pizza, Wine  Bar"), vec!["italian", "pizza", "wine", "bar"]);
        assert_eq!(tokenize("a b cd"), vec!["cd"]);
    }

    #[test]
    fn stop_words_are_removed() {
        let model = build(&["Bar and Grill", "Grill of the Day"]);
        assert_eq!(model.weight(0, "and"), 0.0);
        assert_eq!(model.vocab_len(), 3); // bar, grill, day
    }

    #[test]
    fn identical_rows_have_unit_similarity() {
        let model = build(&["Sushi, Japanese", "Sushi, Japanese"]);
        let sims = model.similarities(0);
        assert!((sims[0] - 1.0).abs() < 1e-6);
        assert!((sims[1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn empty_text_is_a_zero_vector() {
        let model = build(&["", "Pizza"]);
        assert!(model.row(0).unwrap().is_zero());
        assert_eq!(model.similarities(0), vec![0.0, 0.0]);
        assert_eq!(model.similarities(1)[0], 0.0);
    }

    #[test]
    fn rare_terms_weigh_more() {
        let model = build(&["Pizza, Italian", "Pizza, Fast Food", "Pizza, Bar"]);
        assert!(model.weight(0, "italian") > model.weight(0, "pizza"));
    }

    #[test]
    fn shared_terms_rank_above_unrelated() {
        let model = build(&["Thai, Asian", "Asian, Chinese", "Steakhouse"]);
        let sims = model.similarities(0);
        assert!(sims[1] > 0.0);
        assert_eq!(sims[2], 0.0);
    }

    #[test]
    fn term_frequency_counts_repeats() {
        let mut builder = TfIdfBuilder::new()
            .weighting(Weighting::TermFrequency)
            .remove_stop_words(false);
        builder.add("salt salt pepper");
        let model = builder.build();
        let salt = model.weight(0, "salt");
        let pepper = model.weight(0, "pepper");
        assert!((salt - 2.0 * pepper).abs() < 1e-6);
    }

    #[test]
    fn transform_ignores_unknown_terms() {
        let model = build(&["Chicken, Rice"]);
        let query = model.transform("chicken, quinoa");
        assert!(!query.is_zero());
        assert!(model.transform("quinoa").is_zero());
    }
}

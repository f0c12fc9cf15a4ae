use ahash::{AHashMap, AHashSet};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

static RE_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w\w+\b").unwrap());

static ENGLISH_STOP_WORDS: Lazy<AHashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "about", "above", "across", "after", "afterwards", "again", "against", "all",
        "almost", "alone", "along", "already", "also", "although", "always", "am", "among",
        "amongst", "amoungst", "amount", "an", "and", "another", "any", "anyhow", "anyone",
        "anything", "anyway", "anywhere", "are", "around", "as", "at", "back", "be", "became",
        "because", "become", "becomes", "becoming", "been", "before", "beforehand", "behind",
        "being", "below", "beside", "besides", "between", "beyond", "bill", "both", "bottom",
        "but", "by", "call", "can", "cannot", "cant", "co", "con", "could", "couldnt", "cry",
        "de", "describe", "detail", "do", "done", "down", "due", "during", "each", "eg",
        "eight", "either", "eleven", "else", "elsewhere", "empty", "enough", "etc", "even",
        "ever", "every", "everyone", "everything", "everywhere", "except", "few", "fifteen",
        "fifty", "fill", "find", "fire", "first", "five", "for", "former", "formerly", "forty",
        "found", "four", "from", "front", "full", "further", "get", "give", "go", "had", "has",
        "hasnt", "have", "he", "hence", "her", "here", "hereafter", "hereby", "herein",
        "hereupon", "hers", "herself", "him", "himself", "his", "how", "however", "hundred",
        "i", "ie", "if", "in", "inc", "indeed", "interest", "into", "is", "it", "its", "itself",
        "keep", "last", "latter", "latterly", "least", "less", "ltd", "made", "many", "may",
        "me", "meanwhile", "might", "mill", "mine", "more", "moreover", "most", "mostly",
        "move", "much", "must", "my", "myself", "name", "namely", "neither", "never",
        "nevertheless", "next", "nine", "no", "nobody", "none", "noone", "nor", "not",
        "nothing", "now", "nowhere", "of", "off", "often", "on", "once", "one", "only", "onto",
        "or", "other", "others", "otherwise", "our", "ours", "ourselves", "out", "over", "own",
        "part", "per", "perhaps", "please", "put", "rather", "re", "same", "see", "seem",
        "seemed", "seeming", "seems", "serious", "several", "she", "should", "show", "side",
        "since", "sincere", "six", "sixty", "so", "some", "somehow", "someone", "something",
        "sometime", "sometimes", "somewhere", "still", "such", "system", "take", "ten", "than",
        "that", "the", "their", "them", "themselves", "then", "thence", "there", "thereafter",
        "thereby", "therefore", "therein", "thereupon", "these", "they", "thick", "thin",
        "third", "this", "those", "though", "three", "through", "throughout", "thru", "thus",
        "to", "together", "too", "top", "toward", "towards", "twelve", "twenty", "two", "un",
        "under", "until", "up", "upon", "us", "very", "via", "was", "we", "well", "were",
        "what", "whatever", "when", "whence", "whenever", "where", "whereafter", "whereas",
        "whereby", "wherein", "whereupon", "wherever", "whether", "which", "while", "whither",
        "who", "whoever", "whole", "whom", "whose", "why", "will", "with", "within", "without",
        "would", "yet", "you", "your", "yours", "yourself", "yourselves",
    ]
    .into_iter()
    .collect()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopWords {
    #[default]
    English,
    None,
}

impl StopWords {
    fn excludes(self, term: &str) -> bool {
        match self {
            StopWords::English => ENGLISH_STOP_WORDS.contains(term),
            StopWords::None => false,
        }
    }
}

/// One document as a sparse row: column indices ascending, values aligned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseRow {
    pub indices: Vec<usize>,
    pub values: Vec<f64>,
}

impl SparseRow {
    pub fn is_zero(&self) -> bool {
        self.values.iter().all(|v| *v == 0.0)
    }

    pub fn norm_sq(&self) -> f64 {
        self.values.iter().map(|v| v * v).sum()
    }

    pub fn dot_dense(&self, dense: &[f64]) -> f64 {
        self.indices
            .iter()
            .zip(&self.values)
            .map(|(&i, &v)| v * dense[i])
            .sum()
    }

    /// Add this row into a dense accumulator of the same width.
    pub fn add_to(&self, dense: &mut [f64]) {
        for (&i, &v) in self.indices.iter().zip(&self.values) {
            dense[i] += v;
        }
    }

    pub fn to_dense(&self, width: usize) -> Vec<f64> {
        let mut out = vec![0.0; width];
        self.add_to(&mut out);
        out
    }
}

/// Document-term matrix with the vocabulary it was fitted on.
#[derive(Debug, Clone, Default)]
pub struct TfidfMatrix {
    vocabulary: Vec<String>,
    rows: Vec<SparseRow>,
}

impl TfidfMatrix {
    pub fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }

    pub fn rows(&self) -> &[SparseRow] {
        &self.rows
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn column_of(&self, term: &str) -> Option<usize> {
        self.vocabulary.binary_search_by(|t| t.as_str().cmp(term)).ok()
    }
}

/// TF-IDF bag-of-words encoder. Each call to [`Vectorizer::fit_transform`]
/// derives its vocabulary from the corpus it is given and nothing else.
#[derive(Debug, Clone, Default)]
pub struct Vectorizer {
    stop_words: StopWords,
}

impl Vectorizer {
    pub fn new(stop_words: StopWords) -> Self {
        Self { stop_words }
    }

    pub fn tokenize(&self, doc: &str) -> Vec<String> {
        let lower = doc.to_lowercase();
        RE_TOKEN
            .find_iter(&lower)
            .map(|m| m.as_str())
            .filter(|t| !self.stop_words.excludes(t))
            .map(str::to_string)
            .collect()
    }

    pub fn fit_transform<S: AsRef<str>>(&self, corpus: &[S]) -> TfidfMatrix {
        let n_docs = corpus.len();
        let term_counts: Vec<AHashMap<String, usize>> = corpus
            .iter()
            .map(|doc| {
                let mut counts = AHashMap::new();
                for tok in self.tokenize(doc.as_ref()) {
                    *counts.entry(tok).or_insert(0) += 1;
                }
                counts
            })
            .collect();

        let mut doc_freq: BTreeMap<&str, usize> = BTreeMap::new();
        for counts in &term_counts {
            for term in counts.keys() {
                *doc_freq.entry(term.as_str()).or_insert(0) += 1;
            }
        }

        // BTreeMap iteration gives the sorted vocabulary and column order
        let vocabulary: Vec<String> = doc_freq.keys().map(|t| t.to_string()).collect();
        let idf: Vec<f64> = doc_freq
            .values()
            .map(|&df| ((1.0 + n_docs as f64) / (1.0 + df as f64)).ln() + 1.0)
            .collect();

        let rows = term_counts
            .iter()
            .map(|counts| {
                let mut cells: Vec<(usize, f64)> = counts
                    .iter()
                    .filter_map(|(term, &tf)| {
                        let col = vocabulary.binary_search(term).ok()?;
                        Some((col, tf as f64 * idf[col]))
                    })
                    .collect();
                cells.sort_unstable_by_key(|(col, _)| *col);
                let norm = cells.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
                let (indices, values) = cells
                    .into_iter()
                    .map(|(col, v)| (col, if norm > 0.0 { v / norm } else { v }))
                    .unzip();
                SparseRow { indices, values }
            })
            .collect();

        tracing::debug!(docs = n_docs, terms = vocabulary.len(), "tf-idf fitted");
        TfidfMatrix { vocabulary, rows }
    }
}

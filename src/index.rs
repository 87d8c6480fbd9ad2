use crate::parse::{self, Analyzed};
use crate::perf;
use crate::rank;
use crate::types::{DocId, Document, InvertedIndex, SearchResult};
use std::collections::HashMap;

#[cfg(feature = "native")]
use rayon::prelude::*;

/// Inverted index over added documents, scored by TF-IDF
///
/// Documents are only ever added. A document's id is its position in
/// insertion order, and its term counts are cached so scoring never
/// re-tokenizes stored text.
#[derive(Debug, Default)]
pub struct SearchIndex {
    documents: Vec<Document>,
    stats: Vec<Analyzed>,
    index: InvertedIndex,
}

impl SearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document and return its id
    pub fn add_document(&mut self, content: &str) -> DocId {
        let analyzed = parse::analyze(content);
        self.insert(content.to_string(), analyzed)
    }

    /// Add documents in order, returning their ids
    ///
    /// With the `native` feature the documents are tokenized in parallel.
    pub fn add_documents(&mut self, contents: Vec<String>) -> Vec<DocId> {
        #[cfg(feature = "native")]
        let analyzed: Vec<(String, Analyzed)> = contents
            .into_par_iter()
            .map(|content| {
                let stats = parse::analyze(&content);
                (content, stats)
            })
            .collect();

        #[cfg(not(feature = "native"))]
        let analyzed: Vec<(String, Analyzed)> = contents
            .into_iter()
            .map(|content| {
                let stats = parse::analyze(&content);
                (content, stats)
            })
            .collect();

        analyzed
            .into_iter()
            .map(|(content, stats)| self.insert(content, stats))
            .collect()
    }

    fn insert(&mut self, content: String, analyzed: Analyzed) -> DocId {
        let doc_id = self.documents.len() as DocId;

        for term in analyzed.counts.keys() {
            self.index.entry(term.clone()).or_default().insert(doc_id);
        }

        self.documents.push(Document {
            id: doc_id,
            content,
        });
        self.stats.push(analyzed);
        doc_id
    }

    /// Search documents and return up to `max_results` ranked by TF-IDF
    pub fn search(&self, query: &str, max_results: usize) -> Vec<SearchResult> {
        let start_total = perf::now_ms();

        let query_terms = parse::tokenize(query);
        let num_docs = self.documents.len();

        // Accumulate scores per document; repeated query terms count again
        let mut scores: HashMap<DocId, f64> = HashMap::new();
        let mut total_postings = 0usize;

        for term in &query_terms {
            if let Some(postings) = self.index.get(term) {
                let idf = rank::idf(num_docs, postings.len());
                total_postings += postings.len();

                for &doc_id in postings {
                    let Some(stats) = self.stats.get(doc_id as usize) else {
                        continue;
                    };
                    let term_count = stats.counts.get(term).copied().unwrap_or(0);
                    let score = rank::tf(term_count, stats.length) * idf;

                    *scores.entry(doc_id).or_insert(0.0) += score;
                }
            }
        }

        let candidates: Vec<SearchResult> = scores
            .into_iter()
            .map(|(doc_id, score)| SearchResult { doc_id, score })
            .collect();
        let results = rank::top_n(candidates, max_results);

        perf::log(&format!(
            "[perf] query='{}' terms={} postings={} results={} | total={:.1}ms",
            query,
            query_terms.len(),
            total_postings,
            results.len(),
            perf::now_ms() - start_total
        ));

        results
    }

    pub fn document(&self, id: DocId) -> Option<&Document> {
        self.documents.get(id as usize)
    }

    /// Number of documents containing `term` (after tokenization)
    pub fn document_frequency(&self, term: &str) -> usize {
        parse::tokenize(term)
            .first()
            .and_then(|token| self.index.get(token))
            .map_or(0, |postings| postings.len())
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_index() -> SearchIndex {
        let mut index = SearchIndex::new();
        index.add_document("Python is a great programming language");
        index.add_document("Programming in Python is fun and productive");
        index.add_document("Data structures and algorithms are fundamental");
        index
    }

    #[test]
    fn test_ids_are_sequential() {
        let mut index = SearchIndex::new();
        assert_eq!(index.add_document("first"), 0);
        assert_eq!(index.add_document(""), 1);
        assert_eq!(index.add_document("third"), 2);
        assert_eq!(index.len(), 3);
        assert_eq!(index.document(1).map(|d| d.content.as_str()), Some(""));
    }

    #[test]
    fn test_postings_cover_every_token() {
        let index = sample_index();
        for doc in &index.documents {
            for token in parse::tokenize(&doc.content) {
                assert!(index.index[&token].contains(&doc.id));
            }
        }
        assert_eq!(index.document_frequency("Python"), 2);
        assert_eq!(index.document_frequency("algorithms"), 1);
        assert_eq!(index.document_frequency("rust"), 0);
    }

    #[test]
    fn test_search_ranks_relevant_docs() {
        let index = sample_index();
        let results = index.search("python programming", 10);
        let ids: Vec<DocId> = results.iter().map(|r| r.doc_id).collect();
        assert_eq!(ids, vec![0, 1]);
        assert!(results.iter().all(|r| r.score > 0.0));
    }

    #[test]
    fn test_higher_term_frequency_scores_higher() {
        let mut index = SearchIndex::new();
        index.add_document("rust rust alpha beta gamma");
        index.add_document("rust alpha beta gamma delta");
        index.add_document("nothing relevant here at all");

        let results = index.search("rust", 10);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].doc_id, 0);
        assert!(results[0].score > results[1].score);
    }

    #[test]
    fn test_empty_index_returns_nothing() {
        let index = SearchIndex::new();
        assert!(index.search("anything", 10).is_empty());
        assert!(index.is_empty());
    }

    #[test]
    fn test_unknown_terms_are_ignored() {
        let index = sample_index();
        assert!(index.search("haskell", 10).is_empty());
        assert!(index.search("", 10).is_empty());

        let mixed = index.search("haskell algorithms", 10);
        assert_eq!(mixed.len(), 1);
        assert_eq!(mixed[0].doc_id, 2);
    }

    #[test]
    fn test_term_in_every_document_scores_zero() {
        let mut index = SearchIndex::new();
        index.add_document("common one");
        index.add_document("common two");

        let results = index.search("common", 10);
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.score == 0.0));
        // Equal scores fall back to insertion order
        assert_eq!(results[0].doc_id, 0);
    }

    #[test]
    fn test_max_results_truncates() {
        let mut index = SearchIndex::new();
        for i in 0..20 {
            index.add_document(&format!("shared token{}", i));
        }
        index.add_document("unrelated");
        assert_eq!(index.search("shared", 5).len(), 5);
        assert!(index.search("shared", 0).is_empty());
    }

    #[test]
    fn test_add_documents_matches_sequential_insert() {
        let contents = vec![
            "alpha beta".to_string(),
            "beta gamma".to_string(),
            "gamma delta".to_string(),
        ];
        let mut batched = SearchIndex::new();
        let ids = batched.add_documents(contents.clone());
        assert_eq!(ids, vec![0, 1, 2]);

        let mut sequential = SearchIndex::new();
        for content in &contents {
            sequential.add_document(content);
        }
        assert_eq!(batched.search("gamma beta", 10), sequential.search("gamma beta", 10));
    }
}

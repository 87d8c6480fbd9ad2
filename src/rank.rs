use crate::types::SearchResult;
use std::cmp::Ordering;

/// Term frequency: share of a document's tokens that are the term
///
/// An empty document has no frequency for any term.
pub fn tf(term_count: u32, doc_len: u32) -> f64 {
    if doc_len == 0 {
        return 0.0;
    }
    term_count as f64 / doc_len as f64
}

/// Inverse document frequency: ln(N / df)
///
/// Arguments:
/// - num_docs: total number of documents
/// - doc_freq: number of documents containing the term
///
/// Zero when either count is zero, so an empty corpus scores nothing.
pub fn idf(num_docs: usize, doc_freq: usize) -> f64 {
    if num_docs == 0 || doc_freq == 0 {
        return 0.0;
    }
    (num_docs as f64 / doc_freq as f64).ln()
}

/// Ordering for ranked results: score descending, then insertion order
fn by_rank(a: &SearchResult, b: &SearchResult) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.doc_id.cmp(&b.doc_id))
}

/// Get N highest results from an unranked list
pub fn top_n(mut rank_list: Vec<SearchResult>, n: usize) -> Vec<SearchResult> {
    rank_list.sort_by(by_rank);
    rank_list.truncate(n);
    rank_list
}

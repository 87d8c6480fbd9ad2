use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Sequential document identifier, starting at 0
pub type DocId = u32;

/// Document: id and raw text as it was added
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocId,
    pub content: String,
}

/// Inverted index: token -> set of documents containing it
pub type InvertedIndex = HashMap<String, BTreeSet<DocId>>;

/// Term counts for a single document: token -> occurrences
pub type TermCounts = HashMap<String, u32>;

/// Search result with document id and TF-IDF score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub doc_id: DocId,
    pub score: f64,
}

/// Named location with coordinates in degrees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

/// Shortest path between two locations and its total length
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub path: Vec<String>,
    pub distance: f64,
}

/// Timestamped value retained by the stream analyzer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

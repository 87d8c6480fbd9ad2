use chrono::{DateTime, Utc};
use std::cell::RefCell;
use wasm_bindgen::prelude::*;

pub mod config;
pub mod index;
pub mod parse;
pub mod perf;
pub mod rank;
pub mod route;
pub mod stream;
pub mod types;

pub use config::{ConfigError, EngineConfig};
pub use index::SearchIndex;
pub use route::{RouteError, RoutePlanner};
pub use stream::StreamAnalyzer;
pub use types::{DocId, Document, Location, Observation, Route, SearchResult};

/// Engine state behind the JavaScript bindings
struct Engine {
    config: EngineConfig,
    search: SearchIndex,
    planner: RoutePlanner,
    stream: StreamAnalyzer,
}

impl Engine {
    fn from_config(config: EngineConfig) -> Result<Self, ConfigError> {
        let stream = StreamAnalyzer::from_config(&config.stream)?;
        Ok(Engine {
            config,
            search: SearchIndex::new(),
            planner: RoutePlanner::new(),
            stream,
        })
    }
}

// Use thread_local with RefCell for lazy initialization from JS
thread_local! {
    static ENGINE: RefCell<Option<Engine>> = const { RefCell::new(None) };
}

/// Run `f` against the initialized engine
fn with_engine<R>(f: impl FnOnce(&mut Engine) -> Result<R, JsError>) -> Result<R, JsError> {
    ENGINE.with(|engine| {
        let mut engine_ref = engine.borrow_mut();
        match engine_ref.as_mut() {
            Some(eng) => f(eng),
            None => Err(JsError::new(
                "Engine not initialized. Call init_engine(config_json) first.",
            )),
        }
    })
}

/// Initialize a fresh engine from a JSON config
/// config_json: JSON string of EngineConfig; "{}" uses the defaults
#[wasm_bindgen]
pub fn init_engine(config_json: &str) -> Result<(), JsError> {
    let config = EngineConfig::from_json(config_json)?;
    let engine = Engine::from_config(config)?;

    ENGINE.with(|slot| {
        *slot.borrow_mut() = Some(engine);
    });

    Ok(())
}

/// Check if the engine has been initialized
#[wasm_bindgen]
pub fn is_engine_ready() -> bool {
    ENGINE.with(|engine| engine.borrow().is_some())
}

/// Index a document and return its id
#[wasm_bindgen]
pub fn add_document(content: &str) -> Result<u32, JsError> {
    with_engine(|eng| Ok(eng.search.add_document(content)))
}

/// Search all documents and return JSON results
/// n defaults to search.max_results from the config
#[wasm_bindgen]
pub fn search_docs(query: &str, n: Option<u32>) -> Result<String, JsError> {
    with_engine(|eng| {
        let n = n.map_or(eng.config.search.max_results, |n| n as usize);
        let results = eng.search.search(query, n);
        Ok(serde_json::to_string(&results)?)
    })
}

/// Get total number of documents
#[wasm_bindgen]
pub fn get_doc_count() -> Result<usize, JsError> {
    with_engine(|eng| Ok(eng.search.len()))
}

#[wasm_bindgen]
pub fn add_location(id: &str, name: &str, lat: f64, lon: f64) -> Result<(), JsError> {
    with_engine(|eng| {
        eng.planner.add_location(id, name, lat, lon);
        Ok(())
    })
}

/// Add an undirected route; distance defaults to the haversine distance in km
#[wasm_bindgen]
pub fn add_route(from_id: &str, to_id: &str, distance: Option<f64>) -> Result<f64, JsError> {
    with_engine(|eng| Ok(eng.planner.add_route(from_id, to_id, distance)?))
}

/// Shortest route as JSON: {"path": [...], "distance": km}
#[wasm_bindgen]
pub fn find_route(start: &str, end: &str) -> Result<String, JsError> {
    with_engine(|eng| {
        let route = eng.planner.find_shortest_path(start, end)?;
        Ok(serde_json::to_string(&route)?)
    })
}

/// Add a stream value; timestamp_ms is milliseconds since the epoch, default now
/// Returns false when the value was non-finite or too old for the window and dropped
#[wasm_bindgen]
pub fn add_value(value: f64, timestamp_ms: Option<f64>) -> Result<bool, JsError> {
    let timestamp = parse_timestamp_ms(timestamp_ms)?;
    with_engine(|eng| Ok(eng.stream.add_value(value, timestamp)))
}

/// Milliseconds since the epoch to a UTC timestamp; None for non-finite or out-of-range input
fn timestamp_from_ms(ms: f64) -> Option<DateTime<Utc>> {
    if !ms.is_finite() {
        return None;
    }
    // `as` saturates, so NaN and infinities are caught above
    DateTime::<Utc>::from_timestamp_millis(ms as i64)
}

fn parse_timestamp_ms(timestamp_ms: Option<f64>) -> Result<Option<DateTime<Utc>>, JsError> {
    timestamp_ms
        .map(|ms| {
            timestamp_from_ms(ms).ok_or_else(|| JsError::new(&format!("Invalid timestamp: {}", ms)))
        })
        .transpose()
}

#[wasm_bindgen]
pub fn moving_average() -> Result<f64, JsError> {
    with_engine(|eng| Ok(eng.stream.moving_average()))
}

#[wasm_bindgen]
pub fn percentile(p: f64) -> Result<f64, JsError> {
    with_engine(|eng| Ok(eng.stream.percentile(p)))
}

mod ingestion;
mod search;

pub use ingestion::IngestionService;
pub use search::SearchEngine;

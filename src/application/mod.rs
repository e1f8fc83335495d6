//! Use cases over the domain ports: searching the store and ingesting
//! documents into it.

pub mod services;

pub use services::{IngestionService, SearchEngine};

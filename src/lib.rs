//! Local semantic retrieval: chunk documents, embed them with a sentence
//! encoder, keep the vectors in an append-only log and rank them by cosine
//! similarity.

pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;

#[cfg(test)]
pub(crate) mod test_support;

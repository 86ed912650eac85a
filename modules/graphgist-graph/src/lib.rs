pub mod candidate;
pub mod client;
pub mod error;
pub mod migrate;
pub mod neo4j;
pub mod reader;
pub mod store;
pub mod txn;

#[cfg(any(test, feature = "test-utils"))]
pub mod memory;
#[cfg(feature = "test-utils")]
pub mod testutil;

pub use candidate::{resolve_candidate, CandidateService};
pub use client::GraphClient;
pub use error::GraphError;
pub use neo4j::{Neo4jStore, Neo4jTxn};
pub use neo4rs::query;
pub use reader::GraphGistReader;
pub use store::{GraphStore, GraphTxn};
pub use txn::TransactionRunner;

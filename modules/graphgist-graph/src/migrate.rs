use neo4rs::query;
use tracing::{info, warn};

use crate::GraphClient;

/// Run idempotent schema migrations: constraints, indexes.
pub async fn migrate(client: &GraphClient) -> Result<(), neo4rs::Error> {
    let g = &client.graph;

    info!("Running schema migrations...");

    // --- UUID uniqueness constraints ---
    let constraints = [
        "CREATE CONSTRAINT graph_gist_uuid IF NOT EXISTS FOR (n:GraphGist) REQUIRE n.uuid IS UNIQUE",
        "CREATE CONSTRAINT graph_gist_candidate_uuid IF NOT EXISTS FOR (n:GraphGistCandidate) REQUIRE n.uuid IS UNIQUE",
    ];

    for c in &constraints {
        run_ignoring_exists(g, c).await?;
    }
    info!("UUID uniqueness constraints created");

    // --- Lookup indexes ---
    let indexes = [
        "CREATE INDEX graph_gist_slug IF NOT EXISTS FOR (n:GraphGist) ON (n.slug)",
        "CREATE INDEX graph_gist_candidate_slug IF NOT EXISTS FOR (n:GraphGistCandidate) ON (n.slug)",
    ];

    for idx in &indexes {
        run_ignoring_exists(g, idx).await?;
    }
    info!("Slug indexes created");

    Ok(())
}

/// Run a Cypher statement, ignoring errors that indicate the constraint/index already exists.
async fn run_ignoring_exists(
    g: &neo4rs::Graph,
    cypher: &str,
) -> Result<(), neo4rs::Error> {
    match g.run(query(cypher)).await {
        Ok(_) => Ok(()),
        Err(e) => {
            let msg = e.to_string().to_lowercase();
            if msg.contains("already exists") || msg.contains("equivalent") {
                warn!("Already exists (skipped): {}", cypher.chars().take(80).collect::<String>());
                Ok(())
            } else {
                Err(e)
            }
        }
    }
}

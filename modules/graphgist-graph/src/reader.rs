use neo4rs::query;
use uuid::Uuid;

use graphgist_common::{
    Direction, GraphGist, GraphGistCandidate, GraphGistFields, ReferenceRelationship,
    CANDIDATE_LABEL, GRAPH_GIST_LABEL,
};

use crate::error::Result;
use crate::neo4j::{fields_from_row, uuid_from_row, FIELD_PROJECTION};
use crate::GraphClient;

/// Read-only wrapper for the graph. Used by the API to materialize records
/// once an identifier has been resolved.
#[derive(Clone)]
pub struct GraphGistReader {
    client: GraphClient,
}

impl GraphGistReader {
    pub fn new(client: GraphClient) -> Self {
        Self { client }
    }

    pub async fn graph_gist_by_uuid(&self, uuid: Uuid) -> Result<Option<GraphGist>> {
        let found = self
            .fetch_one(GRAPH_GIST_LABEL, "uuid", uuid.to_string())
            .await?;
        Ok(found.map(|(uuid, fields)| GraphGist { uuid, fields }))
    }

    pub async fn graph_gist_by_slug(&self, slug: &str) -> Result<Option<GraphGist>> {
        let found = self.fetch_one(GRAPH_GIST_LABEL, "slug", slug.to_string()).await?;
        Ok(found.map(|(uuid, fields)| GraphGist { uuid, fields }))
    }

    /// Resolve a guide path segment: slugs first, then identifiers.
    pub async fn graph_gist(&self, slug_or_uuid: &str) -> Result<Option<GraphGist>> {
        if let Some(gist) = self.graph_gist_by_slug(slug_or_uuid).await? {
            return Ok(Some(gist));
        }
        match Uuid::parse_str(slug_or_uuid) {
            Ok(uuid) => self.graph_gist_by_uuid(uuid).await,
            Err(_) => Ok(None),
        }
    }

    pub async fn candidate_by_uuid(&self, uuid: Uuid) -> Result<Option<GraphGistCandidate>> {
        let found = self
            .fetch_one(CANDIDATE_LABEL, "uuid", uuid.to_string())
            .await?;
        Ok(found.map(|(uuid, fields)| GraphGistCandidate { uuid, fields }))
    }

    /// Identifiers of nodes attached to the `label` node `uuid` through `rel`.
    pub async fn reference_ids(
        &self,
        label: &str,
        uuid: Uuid,
        rel: ReferenceRelationship,
    ) -> Result<Vec<Uuid>> {
        let t = rel.rel_type();
        let pattern = match rel.direction() {
            Direction::Outgoing => format!("-[:{t}]->"),
            Direction::Incoming => format!("<-[:{t}]-"),
        };
        let cypher = format!(
            "MATCH (n:{label} {{uuid: $uuid}}){pattern}(p)
             RETURN p.uuid AS uuid
             ORDER BY p.uuid"
        );

        let mut stream = self
            .client
            .graph
            .execute(query(&cypher).param("uuid", uuid.to_string()))
            .await?;
        let mut ids = Vec::new();
        while let Some(row) = stream.next().await? {
            ids.push(uuid_from_row(&row, "uuid")?);
        }
        Ok(ids)
    }

    async fn fetch_one(
        &self,
        label: &str,
        key: &str,
        value: String,
    ) -> Result<Option<(Uuid, GraphGistFields)>> {
        let cypher = format!(
            "MATCH (n:{label} {{{key}: $value}}) RETURN {FIELD_PROJECTION} LIMIT 1"
        );
        let mut stream = self
            .client
            .graph
            .execute(query(&cypher).param("value", value))
            .await?;

        match stream.next().await? {
            Some(row) => Ok(Some((uuid_from_row(&row, "uuid")?, fields_from_row(&row)))),
            None => Ok(None),
        }
    }
}

use std::sync::Arc;

use async_graphql::{Context, EmptyMutation, EmptySubscription, Object, Result, Schema};
use tracing::{error, info};
use uuid::Uuid;

use graphgist_graph::{CandidateService, GraphError, GraphGistReader, Neo4jStore};

use super::types::{GqlGraphGist, GqlGraphGistCandidate};

pub type ApiSchema = Schema<QueryRoot, EmptyMutation, EmptySubscription>;

pub type Candidates = CandidateService<Neo4jStore>;

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// Get a published GraphGist by ID.
    async fn graph_gist(&self, ctx: &Context<'_>, uuid: Uuid) -> Result<Option<GqlGraphGist>> {
        let reader = ctx.data_unchecked::<Arc<GraphGistReader>>();
        let gist = reader.graph_gist_by_uuid(uuid).await.map_err(public_error)?;
        Ok(gist.map(GqlGraphGist::from))
    }

    /// Get a published GraphGist by slug.
    async fn graph_gist_by_slug(
        &self,
        ctx: &Context<'_>,
        slug: String,
    ) -> Result<Option<GqlGraphGist>> {
        let reader = ctx.data_unchecked::<Arc<GraphGistReader>>();
        let gist = reader.graph_gist_by_slug(&slug).await.map_err(public_error)?;
        Ok(gist.map(GqlGraphGist::from))
    }

    /// Get a published GraphGist by slug, falling back to its ID.
    async fn graph_gist_by_slug_or_uuid(
        &self,
        ctx: &Context<'_>,
        slug_or_uuid: String,
    ) -> Result<Option<GqlGraphGist>> {
        let reader = ctx.data_unchecked::<Arc<GraphGistReader>>();
        let gist = reader.graph_gist(&slug_or_uuid).await.map_err(public_error)?;
        Ok(gist.map(GqlGraphGist::from))
    }

    /// The editable draft of a GraphGist, created on first request.
    async fn graph_gist_candidate(
        &self,
        ctx: &Context<'_>,
        uuid: Uuid,
    ) -> Result<Option<GqlGraphGistCandidate>> {
        let candidates = ctx.data_unchecked::<Arc<Candidates>>();
        let reader = ctx.data_unchecked::<Arc<GraphGistReader>>();

        let id = candidates
            .get_or_create_candidate(uuid)
            .await
            .map_err(public_error)?;
        info!(graph_gist = %uuid, candidate = %id, "Resolved candidate");

        let candidate = reader.candidate_by_uuid(id.0).await.map_err(public_error)?;
        Ok(candidate.map(GqlGraphGistCandidate::from))
    }
}

/// Log the detail, hand the client a generic message.
pub fn public_error(e: GraphError) -> async_graphql::Error {
    error!(error = %e, "GraphGist query failed");
    let message = match e {
        GraphError::NotFound(_) => "GraphGist not found",
        _ => "Internal error",
    };
    async_graphql::Error::new(message)
}

pub fn build_schema(candidates: Arc<Candidates>, reader: Arc<GraphGistReader>) -> ApiSchema {
    Schema::build(QueryRoot, EmptyMutation, EmptySubscription)
        .data(candidates)
        .data(reader)
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_detail_is_not_leaked() {
        let err = public_error(GraphError::Storage("bolt://10.0.0.3 refused".into()));
        assert_eq!(err.message, "Internal error");

        let err = public_error(GraphError::Conflict(Uuid::new_v4()));
        assert_eq!(err.message, "Internal error");
    }

    #[test]
    fn not_found_is_reported_as_such() {
        let err = public_error(GraphError::NotFound(Uuid::new_v4()));
        assert_eq!(err.message, "GraphGist not found");
    }

    #[test]
    fn sdl_exposes_candidate_query() {
        let sdl = Schema::build(QueryRoot, EmptyMutation, EmptySubscription)
            .finish()
            .sdl();
        assert!(sdl.contains("graphGistCandidate("));
        assert!(sdl.contains("graphGistBySlugOrUuid(slugOrUuid: String!)"));
        assert!(sdl.contains("imageUuids"));
    }
}

use std::sync::Arc;

use async_graphql::{ComplexObject, Context, Result, SimpleObject};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use graphgist_common::{
    GraphGist, GraphGistCandidate, GraphGistFields, ReferenceRelationship, CANDIDATE_LABEL,
};
use graphgist_graph::GraphGistReader;

use super::schema::public_error;

#[derive(SimpleObject)]
#[graphql(name = "GraphGist")]
pub struct GqlGraphGist {
    pub uuid: Uuid,
    pub title: String,
    pub slug: String,
    pub asciidoc: String,
    pub summary: Option<String>,
    pub status: Option<String>,
    pub featured: bool,
    pub is_guide: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<GraphGist> for GqlGraphGist {
    fn from(g: GraphGist) -> Self {
        let GraphGistFields {
            title,
            slug,
            asciidoc,
            summary,
            status,
            featured,
            is_guide,
            created_at,
            updated_at,
        } = g.fields;
        Self {
            uuid: g.uuid,
            title,
            slug,
            asciidoc,
            summary,
            status,
            featured,
            is_guide,
            created_at,
            updated_at,
        }
    }
}

#[derive(SimpleObject)]
#[graphql(name = "GraphGistCandidate", complex)]
pub struct GqlGraphGistCandidate {
    pub uuid: Uuid,
    pub title: String,
    pub slug: String,
    pub asciidoc: String,
    pub summary: Option<String>,
    pub status: Option<String>,
    pub featured: bool,
    pub is_guide: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<GraphGistCandidate> for GqlGraphGistCandidate {
    fn from(c: GraphGistCandidate) -> Self {
        let GqlGraphGist {
            title,
            slug,
            asciidoc,
            summary,
            status,
            featured,
            is_guide,
            created_at,
            updated_at,
            ..
        } = GqlGraphGist::from(GraphGist {
            uuid: c.uuid,
            fields: c.fields,
        });
        Self {
            uuid: c.uuid,
            title,
            slug,
            asciidoc,
            summary,
            status,
            featured,
            is_guide,
            created_at,
            updated_at,
        }
    }
}

#[ComplexObject]
impl GqlGraphGistCandidate {
    /// Authors shared with the published GraphGist.
    async fn author_uuids(&self, ctx: &Context<'_>) -> Result<Vec<Uuid>> {
        self.references(ctx, ReferenceRelationship::Wrote).await
    }

    async fn challenge_uuids(&self, ctx: &Context<'_>) -> Result<Vec<Uuid>> {
        self.references(ctx, ReferenceRelationship::ForChallenge).await
    }

    async fn industry_uuids(&self, ctx: &Context<'_>) -> Result<Vec<Uuid>> {
        self.references(ctx, ReferenceRelationship::ForIndustry).await
    }

    async fn use_case_uuids(&self, ctx: &Context<'_>) -> Result<Vec<Uuid>> {
        self.references(ctx, ReferenceRelationship::ForUseCase).await
    }

    async fn image_uuids(&self, ctx: &Context<'_>) -> Result<Vec<Uuid>> {
        self.references(ctx, ReferenceRelationship::HasImage).await
    }
}

impl GqlGraphGistCandidate {
    async fn references(&self, ctx: &Context<'_>, rel: ReferenceRelationship) -> Result<Vec<Uuid>> {
        let reader = ctx.data_unchecked::<Arc<GraphGistReader>>();
        reader
            .reference_ids(CANDIDATE_LABEL, self.uuid, rel)
            .await
            .map_err(public_error)
    }
}

use std::sync::Arc;

use anyhow::Result;
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::{extract::State, response::Html, routing::get, Router};
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use graphgist_common::Config;
use graphgist_graph::{migrate::migrate, CandidateService, GraphClient, GraphGistReader, Neo4jStore};

mod graphql;

use graphql::{build_schema, ApiSchema};

pub struct AppState {
    pub schema: ApiSchema,
}

async fn graphql_handler(
    State(state): State<Arc<AppState>>,
    req: GraphQLRequest,
) -> GraphQLResponse {
    state.schema.execute(req.into_inner()).await.into()
}

async fn graphiql() -> Html<String> {
    Html(async_graphql::http::GraphiQLSource::build().endpoint("/graphql").finish())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutting down");
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("graphgist=info".parse()?))
        .init();

    let config = Config::from_env()?;

    let client = GraphClient::connect_with_pool(
        &config.neo4j_uri,
        &config.neo4j_user,
        &config.neo4j_password,
        config.neo4j_max_connections,
    )
    .await?;
    migrate(&client).await?;

    let candidates = Arc::new(CandidateService::new(Neo4jStore::new(client.clone())));
    let reader = Arc::new(GraphGistReader::new(client));
    let state = Arc::new(AppState {
        schema: build_schema(candidates, reader),
    });

    let app = Router::new()
        // GraphQL
        .route("/graphql", get(graphiql).post(graphql_handler))
        // Health check
        .route("/", get(|| async { "ok" }))
        .with_state(state)
        // Browser clients send credentials; mirror their origin.
        .layer(CorsLayer::very_permissive())
        // Logging layer: method + path + status + latency only
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                }),
        );

    let addr = format!("{}:{}", config.web_host, config.web_port);
    info!("GraphGist API starting on {addr}");
    info!("GraphiQL IDE available at http://{addr}/graphql");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

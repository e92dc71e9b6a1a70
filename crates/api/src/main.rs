use anyhow::{Context, Result};
use api::pipeline::{self, Pipeline, PipelineSummary, PolicyChoice};
use api::{init_tracing, AppConfig, Metrics, MetricsSnapshot, TimedOperation};
use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse},
    routing::{get, post},
    Json, Router,
};
use extract::TextGenerator;
use index::{GraphStats, GraphStore, LoadReport, Neo4jStore};
use ingest::UploadedFile;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

struct AppState {
    config: AppConfig,
    generator: Option<Arc<dyn TextGenerator>>,
    graph: OnceCell<Arc<Neo4jStore>>,
    metrics: Arc<Metrics>,
    // Pipeline runs and loads share one output directory.
    run_lock: Mutex<()>,
}

impl AppState {
    /// Connects on first use so the server starts without Neo4j.
    async fn graph(&self) -> Result<Arc<Neo4jStore>> {
        self.graph
            .get_or_try_init(|| async { pipeline::connect_graph(&self.config).await.map(Arc::new) })
            .await
            .cloned()
    }
}

type ApiError = (StatusCode, String);

fn internal(context: &str, e: anyhow::Error) -> ApiError {
    error!(error = %format!("{:#}", e), "{}", context);
    (StatusCode::INTERNAL_SERVER_ERROR, format!("{}: {:#}", context, e))
}

fn unavailable(e: anyhow::Error) -> ApiError {
    warn!(error = %format!("{:#}", e), "Graph store unavailable");
    (StatusCode::SERVICE_UNAVAILABLE, format!("{:#}", e))
}

#[derive(Serialize)]
struct HealthResponse {
    generation: String,
    neo4j: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;
    init_tracing(config.log_json);

    let generator = pipeline::generator(&config)?;
    if generator.is_none() {
        info!("Glossary generation disabled");
    }
    if !config.graph_configured() {
        warn!("NEO4J_PASSWORD is not set; /load and /stats will be unavailable");
    }

    let bind_addr = config.bind_addr.clone();
    let body_limit = config.max_upload_bytes;

    let state = Arc::new(AppState {
        config,
        generator,
        graph: OnceCell::new(),
        metrics: Metrics::new(),
        run_lock: Mutex::new(()),
    });

    let app = Router::new()
        .route("/", get(upload_form))
        .route("/health", get(health_check))
        .route("/process", post(process_upload))
        .route("/download/:artifact", get(download_artifact))
        .route("/load", post(load_graph))
        .route("/stats", get(get_stats))
        .route("/metrics", get(get_metrics))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .context(format!("Failed to bind {}", bind_addr))?;

    info!("Server listening on http://{}", bind_addr);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

async fn upload_form() -> Html<&'static str> {
    Html(include_str!("index.html"))
}

async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let generation = if state.generator.is_none() {
        "disabled".to_string()
    } else {
        match reqwest::get(&state.config.generation.base_url).await {
            Ok(resp) if resp.status().is_success() => "ok".to_string(),
            Ok(resp) => format!("error: status {}", resp.status()),
            Err(e) => format!("error: {}", e),
        }
    };

    let neo4j = if !state.config.graph_configured() {
        "not configured".to_string()
    } else {
        match state.graph().await {
            Ok(store) => match store.stats().await {
                Ok(_) => "ok".to_string(),
                Err(e) => format!("error: {:#}", e),
            },
            Err(e) => format!("error: {:#}", e),
        }
    };

    Json(HealthResponse { generation, neo4j })
}

async fn process_upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<PipelineSummary>, ApiError> {
    let mut files = Vec::new();
    let mut policy_name = "naive".to_string();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?
    {
        if field.name() == Some("policy") {
            policy_name = field
                .text()
                .await
                .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
            continue;
        }

        let Some(name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let data = field
            .bytes()
            .await
            .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
        if name.is_empty() {
            continue;
        }
        files.push(UploadedFile::new(name, data.to_vec()));
    }

    if files.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "No files uploaded".to_string()));
    }

    let policy = PolicyChoice::from_name(&policy_name, state.config.gazetteer_terms.clone())
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("{:#}", e)))?;
    let pipeline = Pipeline::new(&state.config, state.generator.clone(), policy)
        .map_err(|e| internal("Pipeline setup failed", e))?;

    let _run = state.run_lock.lock().await;
    let timer = TimedOperation::start();

    match pipeline.process(&files).await {
        Ok(summary) => {
            state.metrics.record_pipeline(
                timer.elapsed(),
                summary.files,
                summary.degraded.len(),
                summary.entities,
                summary.edges,
            );
            Ok(Json(summary))
        }
        Err(e) => {
            state.metrics.record_pipeline_failure();
            Err(internal("Pipeline run failed", e))
        }
    }
}

async fn download_artifact(
    State(state): State<Arc<AppState>>,
    Path(artifact): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    let path = pipeline::artifact_path(&state.config.output_dir, &artifact)
        .ok_or(StatusCode::NOT_FOUND)?;

    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|_| StatusCode::NOT_FOUND)?;

    let headers = [
        (header::CONTENT_TYPE, pipeline::content_type(&artifact).to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", artifact),
        ),
    ];

    Ok((headers, bytes))
}

async fn load_graph(State(state): State<Arc<AppState>>) -> Result<Json<LoadReport>, ApiError> {
    let store = state.graph().await.map_err(unavailable)?;

    let _run = state.run_lock.lock().await;
    let timer = TimedOperation::start();

    match pipeline::load_artifacts(store, &state.config, &state.config.output_dir).await {
        Ok(report) => {
            state.metrics.record_load(
                timer.elapsed(),
                report.nodes_written,
                report.edges_attached,
                report.edges_skipped,
            );
            Ok(Json(report))
        }
        Err(e) => {
            state.metrics.record_load_failure();
            Err(internal("Graph load failed", e))
        }
    }
}

async fn get_stats(State(state): State<Arc<AppState>>) -> Result<Json<GraphStats>, ApiError> {
    let store = state.graph().await.map_err(unavailable)?;

    let stats = store
        .stats()
        .await
        .map_err(|e| internal("Reading graph stats failed", e))?;

    Ok(Json(stats))
}

async fn get_metrics(State(state): State<Arc<AppState>>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}

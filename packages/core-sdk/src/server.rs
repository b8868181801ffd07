use std::{convert::Infallible, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        Html,
    },
    routing::{get, get_service, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::{mpsc, RwLock};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tower_http::services::ServeDir;
use tracing::{error, info};

use crate::{
    config::ProviderEnv,
    content::{self, Session},
    error::GenerationError,
    llm,
    models::{DocumentType, GenerationOptions, GenerationResponse, Provider},
    prompt,
};

const INDEX_HTML: &str = include_str!("../web/index.html");

/**
 * \brief Shared state: one editable session per server process plus the
 * environment snapshot.
 */
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<RwLock<Session>>,
    pub env: Arc<ProviderEnv>,
}

impl AppState {
    pub fn new(session: Session, env: ProviderEnv) -> Self {
        Self {
            session: Arc::new(RwLock::new(session)),
            env: Arc::new(env),
        }
    }
}

/**
 * \brief Start the local HTTP service.
 * \param addr listen address such as "127.0.0.1:5173"
 */
pub async fn run(addr: &str, session: Session) -> Result<()> {
    let ui_dir = std::env::var("DOCWRIGHT_UI_DIR")
        .ok()
        .map(PathBuf::from)
        .filter(|dir| dir.exists());
    let app = router(AppState::new(session, ProviderEnv::from_env()), ui_dir);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {}", addr))?;
    info!("Server listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

/**
 * \brief API routes plus the UI. `ui_dir` replaces the embedded page when given.
 */
pub fn router(state: AppState, ui_dir: Option<PathBuf>) -> Router {
    let api = Router::new()
        .route("/api/health", get(health))
        .route("/api/providers", get(list_providers))
        .route("/api/document-types", get(list_document_types))
        .route("/api/settings", get(get_settings))
        .route("/api/settings/style-guides", put(update_style_guides))
        .route(
            "/api/settings/document-types/{id}",
            put(update_document_type),
        )
        .route("/api/settings/reset", post(reset_settings))
        .route("/api/prompt", post(preview_prompt))
        .route("/api/generate", post(generate))
        .route("/api/generate/stream", post(generate_stream))
        .with_state(state);

    match ui_dir {
        Some(dir) => {
            api.fallback_service(get_service(
                ServeDir::new(dir).append_index_html_on_directories(true),
            ))
        }
        None => api.route("/", get(index)),
    }
}

type ApiError = (StatusCode, Json<ErrorBody>);

#[derive(Serialize, Debug)]
struct ErrorBody {
    error: String,
}

fn api_err(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
}

fn generation_err(err: GenerationError) -> ApiError {
    let status = match &err {
        GenerationError::Vendor { .. } => StatusCode::BAD_GATEWAY,
        GenerationError::MissingCredential { .. } | GenerationError::UnsupportedProvider(_) => {
            StatusCode::BAD_REQUEST
        }
        GenerationError::UnknownDocumentType(_) => StatusCode::NOT_FOUND,
        GenerationError::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };
    api_err(status, err.to_string())
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "ok": true }))
}

#[derive(Serialize, Debug)]
struct ProviderItem {
    id: &'static str,
    label: &'static str,
    supports_grounding: bool,
}

async fn list_providers() -> Json<Vec<ProviderItem>> {
    Json(
        Provider::ALL
            .iter()
            .map(|p| ProviderItem {
                id: p.id(),
                label: p.label(),
                supports_grounding: matches!(p, Provider::Gemini),
            })
            .collect(),
    )
}

async fn list_document_types() -> Json<&'static [DocumentType]> {
    Json(content::document_types())
}

async fn get_settings(State(state): State<AppState>) -> Json<Session> {
    Json(state.session.read().await.clone())
}

#[derive(Deserialize, Debug)]
struct StyleGuidesInput {
    #[serde(default)]
    markdown_style_guide: Option<String>,
    #[serde(default)]
    general_writing_style_guide: Option<String>,
}

async fn update_style_guides(
    State(state): State<AppState>,
    Json(input): Json<StyleGuidesInput>,
) -> Json<Session> {
    let mut session = state.session.write().await;
    if let Some(guide) = input.markdown_style_guide {
        session.set_markdown_style_guide(guide);
    }
    if let Some(guide) = input.general_writing_style_guide {
        session.set_general_writing_style_guide(guide);
    }
    info!("style guides updated");
    Json(session.clone())
}

#[derive(Deserialize, Debug)]
struct DocumentTypeInput {
    #[serde(default)]
    template: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

async fn update_document_type(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<DocumentTypeInput>,
) -> Result<Json<Session>, ApiError> {
    let mut session = state.session.write().await;
    if session.setting(&id).is_none() {
        return Err(generation_err(GenerationError::UnknownDocumentType(id)));
    }
    if let Some(template) = input.template {
        session.set_template(&id, template).map_err(generation_err)?;
    }
    if let Some(description) = input.description {
        session
            .set_description(&id, description)
            .map_err(generation_err)?;
    }
    info!(document_type = %id, "document type settings updated");
    Ok(Json(session.clone()))
}

async fn reset_settings(State(state): State<AppState>) -> Json<Session> {
    let mut session = state.session.write().await;
    session.reset();
    info!("settings reset to defaults");
    Json(session.clone())
}

/**
 * \brief Form submission shared by prompt preview and generation.
 */
#[derive(Deserialize, Debug)]
struct GenerateInput {
    provider: Provider,
    #[serde(default)]
    api_key: Option<String>,
    #[serde(default)]
    document_type: Option<String>,
    #[serde(default)]
    draft: String,
    #[serde(default)]
    instructions: String,
    #[serde(default)]
    use_grounding: bool,
    #[serde(default)]
    azure_endpoint: Option<String>,
    #[serde(default)]
    azure_deployment_name: Option<String>,
    #[serde(default)]
    openai_model_name: Option<String>,
}

struct Prepared {
    prompt: String,
    options: GenerationOptions,
    file_name: String,
}

async fn prepare(state: &AppState, input: &GenerateInput) -> Result<Prepared, ApiError> {
    if input.draft.trim().is_empty() {
        return Err(api_err(
            StatusCode::BAD_REQUEST,
            "Draft content cannot be empty.",
        ));
    }
    let doc_type_id = input
        .document_type
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| api_err(StatusCode::BAD_REQUEST, "Select a doc type."))?;

    // Release the lock before any network call.
    let prompt = {
        let session = state.session.read().await;
        prompt::build_prompt(&session, Some(doc_type_id), &input.draft, &input.instructions)
    }
    .ok_or_else(|| {
        api_err(
            StatusCode::BAD_REQUEST,
            "Failed to construct prompt - check document type selection.",
        )
    })?;

    let options = GenerationOptions {
        use_grounding: input.provider == Provider::Gemini && input.use_grounding,
        azure_endpoint: input.azure_endpoint.clone(),
        azure_deployment_name: input.azure_deployment_name.clone(),
        openai_model_name: input.openai_model_name.clone(),
        on_stream_token: None,
    };
    let doc_name = content::find_document_type(doc_type_id).map(|dt| dt.name);
    Ok(Prepared {
        prompt,
        options,
        file_name: content::download_file_name_today(doc_name),
    })
}

#[derive(Serialize, Debug)]
struct PromptOutput {
    prompt: String,
}

async fn preview_prompt(
    State(state): State<AppState>,
    Json(input): Json<GenerateInput>,
) -> Result<Json<PromptOutput>, ApiError> {
    let prepared = prepare(&state, &input).await?;
    Ok(Json(PromptOutput {
        prompt: prepared.prompt,
    }))
}

#[derive(Serialize, Debug)]
struct GenerateOutput {
    #[serde(flatten)]
    response: GenerationResponse,
    file_name: String,
}

async fn generate(
    State(state): State<AppState>,
    Json(input): Json<GenerateInput>,
) -> Result<Json<GenerateOutput>, ApiError> {
    let prepared = prepare(&state, &input).await?;
    let response = llm::generate(
        &state.env,
        input.provider,
        input.api_key.as_deref(),
        &prepared.prompt,
        &prepared.options,
    )
    .await
    .map_err(|e| {
        error!("generation failed: {}", e);
        generation_err(e)
    })?;
    Ok(Json(GenerateOutput {
        response,
        file_name: prepared.file_name,
    }))
}

/**
 * \brief Streaming generation over SSE: `token` events carry JSON-encoded
 * partial text, then a single `done` (full response) or `error` event.
 */
async fn generate_stream(
    State(state): State<AppState>,
    Json(input): Json<GenerateInput>,
) -> Result<
    Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>>,
    ApiError,
> {
    let prepared = prepare(&state, &input).await?;
    let (tx, rx) = mpsc::unbounded_channel::<Result<Event, Infallible>>();
    let (token_tx, mut token_rx) = mpsc::unbounded_channel::<String>();
    let options = prepared.options.with_stream_sink(token_tx);
    let env = state.env.clone();
    let provider = input.provider;
    let api_key = input.api_key;
    let prompt = prepared.prompt;
    let file_name = prepared.file_name;

    tokio::spawn(async move {
        let forward_tx = tx.clone();
        let forwarder = tokio::spawn(async move {
            while let Some(token) = token_rx.recv().await {
                let _ = forward_tx.send(Ok(json_event("token", &token)));
            }
        });

        let result = llm::generate(&env, provider, api_key.as_deref(), &prompt, &options).await;
        // Closing the sink lets the forwarder drain and finish before the final event.
        drop(options);
        let _ = forwarder.await;

        let event = match result {
            Ok(response) => json_event(
                "done",
                &GenerateOutput {
                    response,
                    file_name,
                },
            ),
            Err(e) => {
                error!("streaming generation failed: {}", e);
                json_event("error", &ErrorBody {
                    error: e.to_string(),
                })
            }
        };
        let _ = tx.send(Ok(event));
    });

    Ok(Sse::new(UnboundedReceiverStream::new(rx)).keep_alive(KeepAlive::new()))
}

fn json_event<T: Serialize>(name: &str, payload: &T) -> Event {
    Event::default()
        .event(name)
        .json_data(payload)
        .unwrap_or_else(|e| Event::default().event("error").data(e.to_string()))
}

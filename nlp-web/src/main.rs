//! Servidor web Axum que expõe o pipeline de anotação via HTTP e WebSocket
//!
//! Rotas:
//! - `POST /analyze`: `{text, language?, overrides?}` → relatório completo.
//! - `GET /ws`: recebe textos e transmite os eventos do pipeline, seguidos do relatório.
//! - `GET /demo-texts`: textos de exemplo.
//! - `GET /health`: estado do servidor e estágios montados.
//!
//! Variáveis de ambiente: `NLP_CONFIG` (caminho de um JSON de configuração),
//! `NLP_ADDR` (padrão `0.0.0.0:3000`) e `RUST_LOG`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use nlp_core::{
    corpus::demo_texts, AnalysisReport, ConfigOverrides, Document, Pipeline, PipelineConfig,
    PipelineEvent,
};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_ADDR: &str = "0.0.0.0:3000";
/// Pausa entre eventos enviados pelo WebSocket (animação passo a passo na interface).
const EVENT_DELAY: Duration = Duration::from_millis(35);

/// Estado compartilhado da aplicação
struct AppState {
    pipeline: Pipeline,
}

#[derive(Deserialize)]
struct AnalyzeRequest {
    text: String,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    overrides: Option<ConfigOverrides>,
}

impl AnalyzeRequest {
    fn into_document(self) -> Document {
        let mut doc = Document::new(self.text);
        if let Some(language) = self.language.filter(|l| !l.trim().is_empty()) {
            doc = doc.with_language(language);
        }
        if let Some(overrides) = self.overrides {
            doc = doc.with_overrides(overrides);
        }
        doc
    }
}

#[derive(Serialize)]
struct AnalyzeResponse {
    #[serde(flatten)]
    report: AnalysisReport,
    processing_ms: u64,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match std::env::var("NLP_CONFIG") {
        Ok(path) => PipelineConfig::from_path(path)?,
        Err(_) => PipelineConfig::default(),
    };
    let state = Arc::new(AppState {
        pipeline: config.build_pipeline()?,
    });

    let addr = std::env::var("NLP_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("servidor NLP iniciado em http://{addr}");
    axum::serve(listener, app(state)).await?;
    Ok(())
}

fn app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/analyze", post(analyze_handler))
        .route("/ws", get(ws_handler))
        .route("/demo-texts", get(demo_texts_handler))
        .route("/health", get(health_handler))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(cors))
        .with_state(state)
}

/// Análise via HTTP POST (sem streaming)
async fn analyze_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnalyzeRequest>,
) -> Response {
    if req.text.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Texto vazio");
    }

    let mut doc = req.into_document();
    let started = Instant::now();
    // O pipeline é síncrono; roda fora do runtime assíncrono
    let joined = tokio::task::spawn_blocking(move || {
        let result = state.pipeline.process(&mut doc);
        (doc, result)
    })
    .await;

    match joined {
        Ok((doc, Ok(()))) => Json(AnalyzeResponse {
            report: AnalysisReport::from_document(&doc),
            processing_ms: started.elapsed().as_millis() as u64,
        })
        .into_response(),
        Ok((_, Err(err))) => {
            warn!(error = %err, "falha no processamento");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
        Err(err) => {
            error!(error = %err, "tarefa de processamento abortada");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "falha interna")
        }
    }
}

async fn demo_texts_handler() -> impl IntoResponse {
    Json(demo_texts())
}

async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "stages": state.pipeline.stage_names(),
    }))
}

/// Upgrade HTTP → WebSocket
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_websocket(socket, state))
}

/// Lê uma mensagem do cliente: JSON `{text, language?, overrides?}` ou texto puro.
fn parse_ws_request(raw: &str) -> AnalyzeRequest {
    serde_json::from_str(raw).unwrap_or_else(|_| AnalyzeRequest {
        text: raw.to_string(),
        language: None,
        overrides: None,
    })
}

/// Recebe textos, executa o pipeline e envia os eventos, depois o relatório
async fn handle_websocket(mut socket: WebSocket, state: Arc<AppState>) {
    info!("WebSocket conectado");

    while let Some(Ok(msg)) = socket.recv().await {
        match msg {
            Message::Text(raw) => {
                let req = parse_ws_request(&raw);
                if req.text.trim().is_empty() {
                    continue;
                }
                info!(chars = req.text.len(), "analisando via WebSocket");

                let mut doc = req.into_document();
                let (tx, rx) = std::sync::mpsc::channel::<PipelineEvent>();
                let pipeline_state = Arc::clone(&state);
                let joined = tokio::task::spawn_blocking(move || {
                    let result = pipeline_state.pipeline.process_streaming(&mut doc, &tx);
                    (doc, result)
                })
                .await;

                // O pipeline terminou: todos os eventos já estão no canal
                let events: Vec<PipelineEvent> = rx.try_iter().collect();
                for event in &events {
                    let Ok(json) = serde_json::to_string(event) else {
                        continue;
                    };
                    if socket.send(Message::Text(json)).await.is_err() {
                        return;
                    }
                    tokio::time::sleep(EVENT_DELAY).await;
                }

                let (doc, result) = match joined {
                    Ok(done) => done,
                    Err(err) => {
                        error!(error = %err, "tarefa de processamento abortada");
                        return;
                    }
                };
                if result.is_err() {
                    // O evento de erro já foi transmitido
                    continue;
                }
                let message = serde_json::json!({
                    "type": "report",
                    "data": AnalysisReport::from_document(&doc),
                });
                if socket.send(Message::Text(message.to_string())).await.is_err() {
                    return;
                }
            }
            Message::Close(_) => {
                info!("WebSocket desconectado");
                return;
            }
            Message::Ping(payload) => {
                let _ = socket.send(Message::Pong(payload)).await;
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> Arc<AppState> {
        Arc::new(AppState {
            pipeline: PipelineConfig::default().build_pipeline().unwrap(),
        })
    }

    fn request(text: &str) -> AnalyzeRequest {
        AnalyzeRequest {
            text: text.to_string(),
            language: None,
            overrides: None,
        }
    }

    #[tokio::test]
    async fn test_empty_text_is_bad_request() {
        let response = analyze_handler(State(state()), Json(request("   "))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_analyze_ok() {
        let response = analyze_handler(State(state()), Json(request("Eine Pizzaria bitte nicht."))).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_ws_request_accepts_plain_text_and_json() {
        let req = parse_ws_request("Hallo Welt");
        assert_eq!(req.text, "Hallo Welt");
        assert!(req.language.is_none());

        let req = parse_ws_request(r#"{"text": "Hello", "language": "EN", "overrides": {"stopword.pos-filter": false}}"#);
        let doc = req.into_document();
        assert_eq!(doc.language(), Some("en"));
        assert_eq!(doc.overrides.get_bool("stopword.pos-filter"), Some(false));
    }
}

//! HTTP server for batch term resolution
//! Simple HTTP server using tokio and basic HTTP handling

use serde::Deserialize;
use std::sync::Arc;
use term_resolver::{
    split_terms, BatchCoordinator, BatchRequest, HttpQueryFrontProvider, ResolutionCache,
    ResolverConfig,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const MAX_REQUEST_BYTES: usize = 64 * 1024;

struct AppState {
    coordinator: BatchCoordinator,
    cache: ResolutionCache,
    config: ResolverConfig,
}

#[derive(Debug, Deserialize)]
struct ResolveRequest {
    /// Terms separated by ';'
    terms: String,
    concurrency: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ResolverConfig::from_env()?;
    let bind_addr = std::env::var("TERM_RESOLVER_BIND").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

    let provider = Arc::new(HttpQueryFrontProvider::new(&config.base_url)?);
    let state = Arc::new(AppState {
        coordinator: BatchCoordinator::from_provider(provider, config.probe_timeout),
        cache: ResolutionCache::new(),
        config,
    });

    let listener = TcpListener::bind(&bind_addr).await?;
    info!("Term resolver listening on {}", bind_addr);
    info!("Catalog: {}", state.config.base_url);

    loop {
        let (stream, addr) = listener.accept().await?;
        info!("New connection from: {}", addr);
        tokio::spawn(handle_connection(stream, Arc::clone(&state)));
    }
}

async fn handle_connection(mut stream: TcpStream, state: Arc<AppState>) {
    match read_request(&mut stream).await {
        Ok(request) => {
            let response = handle_request(&request, &state).await;
            if let Err(e) = stream.write_all(response.as_bytes()).await {
                error!("Failed to write response: {}", e);
            }
        }
        Err(e) => {
            error!("Failed to read from stream: {}", e);
        }
    }
}

/// Read headers, then as much body as `Content-Length` announces.
async fn read_request(stream: &mut TcpStream) -> std::io::Result<String> {
    let mut data = Vec::new();
    let mut buffer = [0; 4096];

    loop {
        let size = stream.read(&mut buffer).await?;
        if size == 0 {
            break;
        }
        data.extend_from_slice(&buffer[..size]);
        if data.len() >= MAX_REQUEST_BYTES {
            break;
        }

        let text = String::from_utf8_lossy(&data);
        if let Some(header_end) = text.find("\r\n\r\n") {
            let expected = content_length(&text[..header_end]);
            if data.len() >= header_end + 4 + expected {
                break;
            }
        }
    }

    Ok(String::from_utf8_lossy(&data).into_owned())
}

fn content_length(headers: &str) -> usize {
    headers
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse().ok())
        .unwrap_or(0)
}

async fn handle_request(request: &str, state: &AppState) -> String {
    let request_line = request.lines().next().unwrap_or_default();
    let parts: Vec<&str> = request_line.split_whitespace().collect();
    if parts.len() < 2 {
        return create_response(400, "Bad Request", "{}");
    }

    let method = parts[0];
    let path = parts[1].split('?').next().unwrap_or("/");
    let path = match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    };

    match (method, path) {
        ("GET", "/api/health") => create_response(
            200,
            "OK",
            r#"{"status":"ok","service":"term-resolver"}"#,
        ),
        ("POST", "/api/resolve") => {
            let body = request
                .find("\r\n\r\n")
                .map(|start| request[start + 4..].trim())
                .unwrap_or_default();
            handle_resolve(body, state).await
        }
        ("OPTIONS", _) => create_response(200, "OK", "{}"),
        _ => {
            warn!("No route for {} {}", method, path);
            create_response(404, "Not Found", r#"{"error":"Not found"}"#)
        }
    }
}

async fn handle_resolve(body: &str, state: &AppState) -> String {
    let payload: ResolveRequest = match serde_json::from_str(body) {
        Ok(payload) => payload,
        Err(e) => {
            let error = serde_json::json!({ "error": format!("Invalid request body: {}", e) });
            return create_response(400, "Bad Request", &error.to_string());
        }
    };

    let terms = split_terms(&payload.terms);
    let limit = payload
        .concurrency
        .unwrap_or(state.config.concurrency_limit);
    info!("Resolving {} terms", terms.len());

    let outcome = state
        .coordinator
        .run(BatchRequest::new(terms, limit), &state.cache)
        .await;

    match serde_json::to_string(&outcome) {
        Ok(json) => create_response(200, "OK", &json),
        Err(e) => {
            error!("Failed to serialize batch outcome: {}", e);
            create_response(500, "Internal Server Error", r#"{"error":"serialization failed"}"#)
        }
    }
}

fn create_response(status: u16, status_text: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {} {}\r\n\
         Content-Type: application/json\r\n\
         Access-Control-Allow-Origin: *\r\n\
         Access-Control-Allow-Methods: GET, POST, OPTIONS\r\n\
         Access-Control-Allow-Headers: Content-Type\r\n\
         Content-Length: {}\r\n\
         \r\n\
         {}",
        status,
        status_text,
        body.len(),
        body
    )
}

mod clients;
mod config;

use bytes::Bytes;
use clients::fetcher_http::HttpContentFetcher;
use clients::matrix_http::HttpMatrix;
use clients::push_http::{HttpPushGateway, NullPushGateway};
use clients::validator_http::{HttpCredentialValidator, RejectingValidator};
use config::CrosstalkConfig;
use crosstalk_api::types::{MappingEntry, PushNotification, SendRequest};
use crosstalk_core::auth::CredentialValidator;
use crosstalk_core::error::BridgeError;
use crosstalk_core::push::{DeviceTokenRecord, InMemoryTokenStore, PushGateway};
use serde::Deserialize;
use crosstalk_core::send::Delivery;
use crosstalk_core::Bridge;
use crosstalk_matrix_client::{MatrixClientConfig, MatrixHttpClient};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use log::{info, warn, LevelFilter};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

#[derive(thiserror::Error, Debug)]
enum DaemonError {
    #[error("config")]
    Config,
    #[error("bridge")]
    Bridge,
    #[error("listen")]
    Listen,
}

#[tokio::main]
async fn main() -> Result<(), DaemonError> {
    let args: Vec<String> = std::env::args().collect();
    let mut path = PathBuf::from("crosstalk.toml");
    let mut i = 1;
    while i + 1 < args.len() {
        if args[i] == "--config" {
            path = PathBuf::from(&args[i + 1]);
        }
        i += 1;
    }
    let cfg = config::load_config(&path).map_err(|_| DaemonError::Config)?;
    init_logging(&cfg);
    let bridge = init_bridge(&cfg).map_err(|_| DaemonError::Bridge)?;
    preload_mappings(&bridge, cfg.mappings_file.as_deref()).await;
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let server = start_control_server(&cfg.listen, bridge, shutdown_rx).await?;
    let ctrl_c = signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let _ = ctrl_c.as_mut().await;
    let _ = shutdown_tx.send(());
    let _ = server.await;
    Ok(())
}

fn init_logging(cfg: &CrosstalkConfig) {
    let level = match cfg.logging.level.to_lowercase().as_str() {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "info" => LevelFilter::Info,
        "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        _ => LevelFilter::Info,
    };
    let _ = env_logger::Builder::from_default_env()
        .filter_level(level)
        .try_init();
}

fn init_bridge(cfg: &CrosstalkConfig) -> Result<Arc<Bridge>, BridgeError> {
    let raw = MatrixHttpClient::new(
        cfg.homeserver.base_url.clone(),
        cfg.homeserver.access_token.clone(),
        MatrixClientConfig::default(),
    )
    .map_err(|e| BridgeError::Matrix(e.to_string()))?;
    let matrix = Arc::new(HttpMatrix::new(raw, &cfg.homeserver.domain));
    let fetcher = Arc::new(HttpContentFetcher::new(Duration::from_secs(30))?);
    let gateway: Arc<dyn PushGateway> = match cfg.push.gateway_url.as_deref() {
        Some(url) if cfg.push.enabled => {
            Arc::new(HttpPushGateway::new(url, Duration::from_secs(10))?)
        }
        _ => Arc::new(NullPushGateway),
    };
    let validator: Arc<dyn CredentialValidator> = match cfg.validator.base_url.as_deref() {
        Some(url) if cfg.validator.enabled => {
            Arc::new(HttpCredentialValidator::new(url, Duration::from_secs(10))?)
        }
        _ => Arc::new(RejectingValidator),
    };
    let tokens = Arc::new(InMemoryTokenStore::new());
    Ok(Arc::new(Bridge::new(
        cfg.bridge_config(),
        matrix,
        fetcher,
        validator,
        tokens,
        gateway,
    )))
}

async fn preload_mappings(bridge: &Bridge, path: Option<&Path>) {
    let Some(path) = path else {
        return;
    };
    match read_mappings(path) {
        Ok(entries) => {
            let applied = bridge.bulk_load_mappings(entries).await;
            info!("preloaded {} mapping entries from {:?}", applied, path);
        }
        Err(err) => warn!("mapping preload from {:?} skipped: {}", path, err),
    }
}

fn read_mappings(path: &Path) -> Result<Vec<MappingEntry>, String> {
    let content = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    serde_json::from_str(&content).map_err(|e| e.to_string())
}

async fn start_control_server(
    listen: &str,
    bridge: Arc<Bridge>,
    shutdown: oneshot::Receiver<()>,
) -> Result<JoinHandle<()>, DaemonError> {
    let addr: SocketAddr = listen.parse().map_err(|_| DaemonError::Listen)?;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|_| DaemonError::Listen)?;
    info!("control server listening on {}", addr);
    let handle = tokio::spawn(async move {
        let mut shutdown = shutdown;
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    break;
                }
                res = listener.accept() => {
                    match res {
                        Ok((stream, _)) => {
                            let bridge = bridge.clone();
                            tokio::spawn(async move {
                                let io = TokioIo::new(stream);
                                let service = service_fn(move |req: Request<Incoming>| {
                                    let bridge = bridge.clone();
                                    async move { handle_request(bridge, req).await }
                                });
                                let _ = http1::Builder::new().serve_connection(io, service).await;
                            });
                        }
                        Err(_) => break,
                    }
                }
            }
        }
    });
    Ok(handle)
}

async fn handle_request(
    bridge: Arc<Bridge>,
    req: Request<Incoming>,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let method = req.method().as_str().to_string();
    let path = req.uri().path().to_string();
    let query_user = query_param(req.uri().query(), "user");
    match (method.as_str(), path.as_str()) {
        ("GET", "/health") => Ok(json_response(
            StatusCode::OK,
            serde_json::json!({"status": "ok"}),
        )),
        ("POST", "/send") => {
            let body = req.collect().await?.to_bytes();
            let request: SendRequest = match serde_json::from_slice(&body) {
                Ok(request) => request,
                Err(err) => return Ok(bad_request(&err.to_string())),
            };
            match bridge.send_message(&request).await {
                Ok(outcome) => Ok(json_response(
                    StatusCode::OK,
                    serde_json::json!({
                        "message_id": outcome.event_id,
                        "delivery": delivery_label(outcome.delivery),
                    }),
                )),
                Err(err) => Ok(error_response(&err)),
            }
        }
        ("GET", "/fetch") => {
            let Some(identifier) = query_user else {
                return Ok(bad_request("missing user parameter"));
            };
            let Some(matrix_id) = bridge.resolve(&identifier).await else {
                return Ok(error_response(&BridgeError::NotFound));
            };
            match bridge.fetch_since(&matrix_id).await {
                Ok(result) => Ok(json_response(
                    StatusCode::OK,
                    serde_json::to_value(result).unwrap_or_default(),
                )),
                Err(err) => Ok(error_response(&err)),
            }
        }
        ("POST", "/push") => {
            let body = req.collect().await?.to_bytes();
            let notification: PushNotification = match serde_json::from_slice(&body) {
                Ok(notification) => notification,
                Err(err) => return Ok(bad_request(&err.to_string())),
            };
            let rejected = bridge.translate_push(&notification).await;
            Ok(json_response(
                StatusCode::OK,
                serde_json::json!({"rejected": rejected}),
            ))
        }
        ("GET", "/mappings") => {
            let entries = bridge.list_mappings().await;
            Ok(json_response(
                StatusCode::OK,
                serde_json::to_value(entries).unwrap_or_default(),
            ))
        }
        ("POST", "/devices") => {
            let body = req.collect().await?.to_bytes();
            let registration: DeviceRegistration = match serde_json::from_slice(&body) {
                Ok(registration) => registration,
                Err(err) => return Ok(bad_request(&err.to_string())),
            };
            match bridge
                .register_push_device(
                    &registration.identifier,
                    &registration.pushkey,
                    registration.record,
                )
                .await
            {
                Ok(()) => Ok(json_response(
                    StatusCode::OK,
                    serde_json::json!({"status": "ok"}),
                )),
                Err(err) => Ok(error_response(&err)),
            }
        }
        ("POST", "/mappings") => {
            let body = req.collect().await?.to_bytes();
            let entry: MappingEntry = match serde_json::from_slice(&body) {
                Ok(entry) => entry,
                Err(err) => return Ok(bad_request(&err.to_string())),
            };
            match bridge.upsert_mapping(entry).await {
                Ok(()) => Ok(json_response(
                    StatusCode::OK,
                    serde_json::json!({"status": "ok"}),
                )),
                Err(err) => Ok(error_response(&err)),
            }
        }
        _ => Ok(Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Full::from(Bytes::from_static(b"not found")))
            .unwrap()),
    }
}

#[derive(Deserialize)]
struct DeviceRegistration {
    identifier: String,
    pushkey: String,
    record: DeviceTokenRecord,
}

fn delivery_label(delivery: Delivery) -> &'static str {
    match delivery {
        Delivery::Text => "text",
        Delivery::Media => "media",
        Delivery::TextFallback => "text_fallback",
    }
}

fn status_for(err: &BridgeError) -> StatusCode {
    match err {
        BridgeError::Auth => StatusCode::UNAUTHORIZED,
        BridgeError::UnknownSender(_)
        | BridgeError::UnknownRecipient(_)
        | BridgeError::Validation(_) => StatusCode::BAD_REQUEST,
        BridgeError::NotFound => StatusCode::NOT_FOUND,
        BridgeError::Matrix(_) => StatusCode::BAD_GATEWAY,
    }
}

fn error_response(err: &BridgeError) -> Response<Full<Bytes>> {
    json_response(
        status_for(err),
        serde_json::json!({"error": err.to_string()}),
    )
}

fn bad_request(message: &str) -> Response<Full<Bytes>> {
    json_response(
        StatusCode::BAD_REQUEST,
        serde_json::json!({"error": message}),
    )
}

fn json_response(status: StatusCode, body: serde_json::Value) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(Full::from(body.to_string()))
        .unwrap()
}

fn query_param(query: Option<&str>, name: &str) -> Option<String> {
    let query = query?;
    for pair in query.split('&') {
        let mut parts = pair.splitn(2, '=');
        if parts.next() == Some(name) {
            return parts.next().map(str::to_string);
        }
    }
    None
}

// ────────────────────────────────
// src/server/routes.rs
// HTTP surface of one game instance
// ────────────────────────────────

use crate::game::{parse_interval_ms, parse_peer_address, Game, GameError};
use crate::metrics::MetricsRegistry;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Body, Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};
use url::{form_urlencoded, Url};

const GAME_PATHS: [&str; 6] = ["/ping", "/start", "/pause", "/resume", "/stop", "/status"];

/// Body of every command response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBody {
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    BadRequest(#[from] GameError),

    #[error("Not Found")]
    NotFound,

    #[error("Method Not Allowed")]
    MethodNotAllowed,

    #[error("Failed to encode response: {0}")]
    Encode(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Encode(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ApiError> for Response<Body> {
    fn from(err: ApiError) -> Self {
        let status = err.status();
        // A plain message body cannot fail to serialise.
        let body = serde_json::to_vec(&MessageBody {
            message: err.to_string(),
        })
        .unwrap_or_default();
        json_response(status, body)
    }
}

pub struct GameService {
    game: Arc<Game>,
    metrics: Option<(Arc<MetricsRegistry>, String)>,
}

impl GameService {
    pub fn new(game: Arc<Game>) -> Self {
        Self {
            game,
            metrics: None,
        }
    }

    /// Expose the prometheus registry under `path` (GET).
    pub fn with_metrics(mut self, registry: Arc<MetricsRegistry>, path: impl Into<String>) -> Self {
        self.metrics = Some((registry, path.into()));
        self
    }

    pub async fn handle(&self, req: Request<Body>) -> Response<Body> {
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let query = req.uri().query().map(str::to_string);
        debug!(%method, %path, "request");

        match self.route(&method, &path, query.as_deref()).await {
            Ok(response) => response,
            Err(err) => {
                if let ApiError::BadRequest(_) | ApiError::Encode(_) = err {
                    warn!(%path, "{}", err);
                }
                err.into()
            }
        }
    }

    async fn route(
        &self,
        method: &Method,
        path: &str,
        query: Option<&str>,
    ) -> Result<Response<Body>, ApiError> {
        match (method, path) {
            (&Method::POST, "/ping") => message(self.game.ping().await.message()),
            (&Method::POST, "/start") => {
                let (peer, interval_ms) = start_params(query)?;
                self.game.start(peer, interval_ms).await?;
                message("Game started")
            }
            (&Method::POST, "/pause") => message(self.game.pause().await.message()),
            (&Method::POST, "/resume") => message(self.game.resume().await.message()),
            (&Method::POST, "/stop") => {
                self.game.stop().await;
                message("Game stopped")
            }
            (&Method::GET, "/status") => {
                let snapshot = self.game.snapshot().await;
                let body =
                    serde_json::to_vec(&snapshot).map_err(|e| ApiError::Encode(e.to_string()))?;
                Ok(json_response(StatusCode::OK, body))
            }
            (&Method::GET, _) if self.is_metrics_path(path) => self.render_metrics(),
            _ if GAME_PATHS.contains(&path) || self.is_metrics_path(path) => {
                Err(ApiError::MethodNotAllowed)
            }
            _ => Err(ApiError::NotFound),
        }
    }

    fn is_metrics_path(&self, path: &str) -> bool {
        matches!(&self.metrics, Some((_, metrics_path)) if metrics_path == path)
    }

    fn render_metrics(&self) -> Result<Response<Body>, ApiError> {
        let (registry, _) = self.metrics.as_ref().ok_or(ApiError::NotFound)?;
        let text = registry
            .gather()
            .map_err(|e| ApiError::Encode(e.to_string()))?;

        let mut response = Response::new(Body::from(text));
        response.headers_mut().insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/plain; version=0.0.4"),
        );
        Ok(response)
    }
}

/// `peerAddress` and `intervalMs`, also accepted as `other_instance_url` and `interval`.
fn start_params(query: Option<&str>) -> Result<(Url, u64), GameError> {
    let mut peer = None;
    let mut interval = None;

    for (key, value) in form_urlencoded::parse(query.unwrap_or_default().as_bytes()) {
        match key.as_ref() {
            "peerAddress" | "other_instance_url" => peer = Some(value.into_owned()),
            "intervalMs" | "interval" => interval = Some(value.into_owned()),
            _ => {}
        }
    }

    let peer = peer.ok_or(GameError::MissingParameter("peerAddress"))?;
    let interval = interval.ok_or(GameError::MissingParameter("intervalMs"))?;
    Ok((parse_peer_address(&peer)?, parse_interval_ms(&interval)?))
}

fn message(text: &str) -> Result<Response<Body>, ApiError> {
    let body = serde_json::to_vec(&MessageBody {
        message: text.to_string(),
    })
    .map_err(|e| ApiError::Encode(e.to_string()))?;
    Ok(json_response(StatusCode::OK, body))
}

fn json_response(status: StatusCode, body: Vec<u8>) -> Response<Body> {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

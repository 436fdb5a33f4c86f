use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Body;
use hyper::header::{
    HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE,
};
use hyper::{Method, Request, Response, StatusCode};
use redisinfo::{parse_client_list, parse_info, ParsedInfo};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::keyinfo::fetch_key;
use crate::metrics::SharedMetrics;
use crate::seed::seed_sample_data;
use crate::store::{KillReply, KillTarget, Store, StoreError};

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";
const METRICS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{context}: {source}")]
    Store {
        context: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("Either client address or ID is required")]
    MissingClientTarget,

    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error("Invalid key encoding: {0}")]
    InvalidKey(String),

    #[error("Not found")]
    NotFound,

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Failed to encode metrics: {0}")]
    Metrics(#[from] prometheus::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Store { .. } | ApiError::Metrics(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::MissingClientTarget | ApiError::InvalidBody(_) | ApiError::InvalidKey(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
        }
    }

    fn body(&self) -> Value {
        match self {
            ApiError::Store { context, source } => {
                json!({ "error": context, "message": source.to_string() })
            }
            ApiError::InvalidBody(msg) => {
                json!({ "error": "Invalid request body", "message": msg })
            }
            other => json!({ "error": other.to_string() }),
        }
    }
}

fn store_failure(context: &'static str) -> impl FnOnce(StoreError) -> ApiError {
    move |source| ApiError::Store { context, source }
}

enum Route {
    Keys,
    Key(String),
    Stats,
    Clients,
    KillClient,
    Metrics,
}

fn route(path: &str) -> Result<Route, ApiError> {
    match path {
        "/api/keys" => Ok(Route::Keys),
        "/api/stats" => Ok(Route::Stats),
        "/api/clients" => Ok(Route::Clients),
        "/api/clients/kill" => Ok(Route::KillClient),
        "/metrics" => Ok(Route::Metrics),
        _ => match path.strip_prefix("/api/keys/") {
            Some("") => Ok(Route::Keys),
            Some(raw) => urlencoding::decode(raw)
                .map(|key| Route::Key(key.into_owned()))
                .map_err(|e| ApiError::InvalidKey(e.to_string())),
            None => Err(ApiError::NotFound),
        },
    }
}

#[derive(Debug, Serialize)]
struct StatsResponse {
    info: String,
    #[serde(rename = "parsedInfo")]
    parsed_info: ParsedInfo,
}

#[derive(Debug, Serialize)]
struct KillResponse {
    success: bool,
    result: KillReply,
}

/// Body of a kill request. Either field may be a string or a number; an empty
/// string or the number 0 counts as absent.
#[derive(Debug, Default, Deserialize)]
struct KillRequest {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    addr: Option<Value>,
}

impl KillRequest {
    /// The connection to kill; the id wins when both are given.
    fn target(self) -> Option<KillTarget> {
        non_empty(self.id)
            .map(KillTarget::Id)
            .or_else(|| non_empty(self.addr).map(KillTarget::Addr))
    }
}

fn non_empty(value: Option<Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        Some(Value::Number(n)) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        _ => None,
    }
}

#[derive(Debug, Clone, Default)]
pub struct AppOptions {
    /// Write sample keys on a stats request when the store is (nearly) empty.
    pub seed_sample_data: bool,
}

/// Request handler shared by every connection.
#[derive(Clone)]
pub struct App {
    store: Arc<dyn Store>,
    metrics: SharedMetrics,
    options: AppOptions,
}

impl App {
    pub fn new(store: Arc<dyn Store>, metrics: SharedMetrics, options: AppOptions) -> Self {
        Self {
            store,
            metrics,
            options,
        }
    }

    pub fn metrics(&self) -> &SharedMetrics {
        &self.metrics
    }

    /// Answer a single HTTP request. Failures are turned into JSON error responses.
    pub async fn handle<B>(&self, req: Request<B>) -> Response<Full<Bytes>>
    where
        B: Body,
        B::Error: std::fmt::Display,
    {
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        debug!("Handling {} {}", method, path);

        if method == Method::OPTIONS {
            return preflight();
        }

        match self.dispatch(&method, &path, req.into_body()).await {
            Ok(response) => response,
            Err(e) => {
                if let ApiError::Store { .. } = e {
                    self.metrics.store_error();
                }
                error!("Error handling {} {}: {}", method, path, e);
                json_response(e.status(), &e.body())
            }
        }
    }

    async fn dispatch<B>(
        &self,
        method: &Method,
        path: &str,
        body: B,
    ) -> Result<Response<Full<Bytes>>, ApiError>
    where
        B: Body,
        B::Error: std::fmt::Display,
    {
        match (route(path)?, method) {
            (Route::Keys, &Method::GET) => self.list_keys().await,
            (Route::Key(key), &Method::GET) => self.key_info(&key).await,
            (Route::Stats, &Method::GET) => self.stats().await,
            (Route::Clients, &Method::GET) => self.clients().await,
            (Route::KillClient, &Method::POST) => {
                let body = body
                    .collect()
                    .await
                    .map_err(|e| ApiError::InvalidBody(e.to_string()))?
                    .to_bytes();
                self.kill_client(&body).await
            }
            (Route::Metrics, &Method::GET) => {
                let mut response = Response::new(Full::new(Bytes::from(self.metrics.encode()?)));
                response
                    .headers_mut()
                    .insert(CONTENT_TYPE, HeaderValue::from_static(METRICS_CONTENT_TYPE));
                Ok(response)
            }
            _ => Err(ApiError::MethodNotAllowed),
        }
    }

    async fn list_keys(&self) -> Result<Response<Full<Bytes>>, ApiError> {
        self.metrics.add_api_call("keys");
        let keys = self
            .store
            .keys("*")
            .await
            .map_err(store_failure("Failed to fetch keys"))?;
        Ok(json_response(StatusCode::OK, &keys))
    }

    async fn key_info(&self, key: &str) -> Result<Response<Full<Bytes>>, ApiError> {
        self.metrics.add_api_call("key");
        let info = fetch_key(self.store.as_ref(), key)
            .await
            .map_err(store_failure("Failed to fetch key info"))?;
        Ok(json_response(StatusCode::OK, &info))
    }

    async fn stats(&self) -> Result<Response<Full<Bytes>>, ApiError> {
        self.metrics.add_api_call("stats");
        let context = "Failed to fetch stats";

        let keys = self.store.keys("*").await.map_err(store_failure(context))?;
        debug!("Current Redis key count: {}", keys.len());

        // the reported count stays the one observed before seeding
        if self.options.seed_sample_data && keys.len() <= 1 {
            seed_sample_data(self.store.as_ref())
                .await
                .map_err(store_failure(context))?;
        }

        let info = self.store.info().await.map_err(store_failure(context))?;
        let parsed_info = parse_info(&info).with_key_count(keys.len());
        self.metrics.set_key_count(keys.len());

        Ok(json_response(
            StatusCode::OK,
            &StatsResponse { info, parsed_info },
        ))
    }

    async fn clients(&self) -> Result<Response<Full<Bytes>>, ApiError> {
        self.metrics.add_api_call("clients");
        let raw = self
            .store
            .client_list()
            .await
            .map_err(store_failure("Failed to fetch clients"))?;
        Ok(json_response(StatusCode::OK, &parse_client_list(&raw)))
    }

    async fn kill_client(&self, body: &[u8]) -> Result<Response<Full<Bytes>>, ApiError> {
        self.metrics.add_api_call("kill_client");

        let request = if body.iter().all(u8::is_ascii_whitespace) {
            KillRequest::default()
        } else {
            serde_json::from_slice::<KillRequest>(body)
                .map_err(|e| ApiError::InvalidBody(e.to_string()))?
        };
        let target = request.target().ok_or(ApiError::MissingClientTarget)?;

        info!("Killing client {:?}", target);
        let result = self
            .store
            .client_kill(&target)
            .await
            .map_err(store_failure("Failed to kill client"))?;

        Ok(json_response(
            StatusCode::OK,
            &KillResponse {
                success: true,
                result,
            },
        ))
    }
}

fn json_response<T: Serialize + ?Sized>(status: StatusCode, value: &T) -> Response<Full<Bytes>> {
    let (status, body) = match serde_json::to_vec(value) {
        Ok(body) => (status, body),
        Err(e) => {
            error!("Error encoding response: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                br#"{"error":"Failed to encode response"}"#.to_vec(),
            )
        }
    };

    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    response
}

fn preflight() -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = StatusCode::NO_CONTENT;
    let headers = response.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET,HEAD,PUT,PATCH,POST,DELETE"),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    response
}

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    body::Bytes,
    extract::{
        rejection::{BytesRejection, QueryRejection},
        Query, State,
    },
    http::{header, HeaderValue, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use crate::core::{IndexError, Record};
use crate::index::Indexer;
use crate::query::QueryEngine;
use crate::stats::ConsistencyVerifier;

const CREATE_OK: &str = "Cooking preset creation successful";
const CREATE_FAILED: &str = "Cooking preset creation unsuccessful";
const SEARCH_FAILED: &str = "Cooking preset search unsuccessful";
const STATUS_FAILED: &str = "Index status unavailable";
const REPAIR_FAILED: &str = "Index repair unsuccessful";

#[derive(Clone)]
pub struct AppState {
    pub indexer: Arc<Indexer>,
    pub engine: Arc<QueryEngine>,
    pub verifier: Arc<ConsistencyVerifier>,
}

/// HTTP 边界：POST 创建 / GET 检索 / GET status。
/// 所有失败统一折叠为一个状态码 + 通用消息，类型化细节只进日志。
pub struct QueryServer {
    state: AppState,
}

impl QueryServer {
    pub fn new(
        indexer: Arc<Indexer>,
        engine: Arc<QueryEngine>,
        verifier: Arc<ConsistencyVerifier>,
    ) -> Self {
        Self {
            state: AppState {
                indexer,
                engine,
                verifier,
            },
        }
    }

    pub fn indexer(&self) -> &Indexer {
        &self.state.indexer
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route(
                "/presets",
                get(search_handler)
                    .post(create_handler)
                    .options(preflight_handler),
            )
            .route("/status", get(status_handler))
            .route("/repair", post(repair_handler))
            .layer(middleware::map_response(cors_headers))
            .with_state(self.state.clone())
    }

    /// 绑定失败（端口占用/地址非法）直接返回错误，由调用方决定退出
    pub async fn bind(bind: &str, port: u16) -> anyhow::Result<tokio::net::TcpListener> {
        let addr = format!("{}:{}", bind, port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind HTTP listener on {}", addr))?;
        tracing::info!("HTTP Preset Server listening on {}", addr);
        Ok(listener)
    }

    pub async fn serve(self, listener: tokio::net::TcpListener) -> anyhow::Result<()> {
        axum::serve(listener, self.router()).await?;
        Ok(())
    }
}

async fn cors_headers(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("OPTIONS,POST,GET"),
    );
    response
}

fn message(status: StatusCode, text: &str) -> Response {
    (status, Json(json!({ "message": text }))).into_response()
}

/// 请求体提取失败（超出 body 上限等）同样折叠为 422
async fn create_handler(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let result = body
        .map_err(|e| IndexError::validation(format!("unreadable request body: {e}")))
        .and_then(|body| {
            serde_json::from_slice::<Value>(&body)
                .map_err(|e| IndexError::validation(format!("malformed request body: {e}")))
        })
        .and_then(Record::from_json)
        .and_then(|record| state.indexer.create(record));

    match result {
        Ok(()) => message(StatusCode::CREATED, CREATE_OK),
        Err(e) => {
            tracing::warn!(error = %e, "preset creation failed");
            message(StatusCode::UNPROCESSABLE_ENTITY, CREATE_FAILED)
        }
    }
}

async fn search_handler(
    State(state): State<AppState>,
    criteria: Result<Query<HashMap<String, String>>, QueryRejection>,
) -> Response {
    let criteria = match criteria {
        Ok(Query(criteria)) => criteria,
        Err(e) => {
            tracing::warn!(error = %e, "malformed search query");
            return message(StatusCode::NOT_FOUND, SEARCH_FAILED);
        }
    };
    match state.engine.search(&criteria) {
        Ok(response) => Json(response).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, ?criteria, "preset search failed");
            message(StatusCode::NOT_FOUND, SEARCH_FAILED)
        }
    }
}

async fn preflight_handler() -> StatusCode {
    StatusCode::OK
}

async fn status_handler(State(state): State<AppState>) -> Response {
    match state.verifier.scan() {
        Ok(report) => Json(report).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "consistency scan failed");
            message(StatusCode::SERVICE_UNAVAILABLE, STATUS_FAILED)
        }
    }
}

async fn repair_handler(State(state): State<AppState>) -> Response {
    match state.verifier.verify_and_repair() {
        Ok(repaired) => Json(json!({ "repaired": repaired })).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "index repair failed");
            message(StatusCode::SERVICE_UNAVAILABLE, REPAIR_FAILED)
        }
    }
}

//! Prometheus HTTP API frontend.
//!
//! Only the endpoints that map onto a plain select are served:
//! `/api/v1/series` and selector-only `/api/v1/query_range`. Expression
//! evaluation belongs to a PromQL engine sitting on top of [`Queryable`].

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Form, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};

use crate::cliopt::DEFAULT_LOOKBACK;
use crate::config::Config;
use crate::context::QueryContext;
use crate::error::{ErrorKind, Result};
use crate::model::{parse_time, TimeRange};
use crate::output::{collect_matrix, collect_series, ApiValue, Encoder, PromApiEncoder};
use crate::parser::parse_selector;
use crate::storage::{OpenTsdbQueryable, Queryable};

pub const API_PREFIX: &str = "/api/v1";

type Params = Vec<(String, String)>;

#[derive(Clone)]
struct AppState {
    storage: Arc<dyn Queryable>,
    encoder: Arc<PromApiEncoder>,
    query_timeout: Duration,
}

pub fn build_router(storage: Arc<dyn Queryable>, query_timeout: Duration) -> Router {
    let state = AppState {
        storage,
        encoder: Arc::new(PromApiEncoder::new()),
        query_timeout,
    };

    let api = Router::new()
        .route("/series", get(series_handler).post(series_handler))
        .route(
            "/query_range",
            get(query_range_handler).post(query_range_handler),
        )
        .route("/label/:name/values", get(label_values_handler))
        .with_state(state);

    Router::new().nest(API_PREFIX, api)
}

pub async fn run_server(config: Config) -> Result<()> {
    let storage = Arc::new(OpenTsdbQueryable::new(config.clone())?);
    let app = build_router(storage, config.query_timeout());

    let listener = tokio::net::TcpListener::bind(config.listen_addr()).await?;
    tracing::info!(
        addr = %config.listen_addr(),
        opentsdb = %config.opentsdb_url(),
        "listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

async fn series_handler(State(state): State<AppState>, Form(params): Form<Params>) -> Response {
    let res = series(&state, &params).await;
    respond(&state, "series", res)
}

async fn query_range_handler(
    State(state): State<AppState>,
    Form(params): Form<Params>,
) -> Response {
    let res = query_range(&state, &params).await;
    respond(&state, "query_range", res)
}

async fn label_values_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Response {
    let res = label_values(&state, &name).await;
    respond(&state, "label_values", res)
}

async fn series(state: &AppState, params: &[(String, String)]) -> Result<ApiValue> {
    let selectors = param_values(params, "match[]");
    if selectors.is_empty() {
        return Err("no match[] parameter provided".into());
    }
    let matchers = selectors
        .iter()
        .map(|s| parse_selector(s))
        .collect::<Result<Vec<_>>>()?;

    let querier = state.storage.querier(time_range(params)?)?;
    let ctx = QueryContext::with_timeout(state.query_timeout);

    let mut seen = HashSet::new();
    let mut result = vec![];
    for m in &matchers {
        let mut set = querier.select(&ctx, m).await;
        for labels in collect_series(set.as_mut())? {
            if seen.insert(labels.clone()) {
                result.push(labels);
            }
        }
    }
    querier.close()?;

    Ok(ApiValue::Series(result))
}

async fn query_range(state: &AppState, params: &[(String, String)]) -> Result<ApiValue> {
    let query = match param_values(params, "query").first() {
        Some(query) => parse_selector(query)?,
        None => return Err("no query parameter provided".into()),
    };

    let querier = state.storage.querier(time_range(params)?)?;
    let ctx = QueryContext::with_timeout(state.query_timeout);

    let mut set = querier.select(&ctx, &query).await;
    let matrix = collect_matrix(set.as_mut())?;
    querier.close()?;

    Ok(ApiValue::Matrix(matrix))
}

async fn label_values(state: &AppState, name: &str) -> Result<ApiValue> {
    let querier = state.storage.querier(TimeRange::last(DEFAULT_LOOKBACK)?)?;
    let values = querier.label_values(name).await?;
    querier.close()?;
    Ok(ApiValue::LabelValues(values))
}

fn param_values<'a>(params: &'a [(String, String)], key: &str) -> Vec<&'a str> {
    params
        .iter()
        .filter(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
        .collect()
}

fn time_range(params: &[(String, String)]) -> Result<TimeRange> {
    let parse = |key: &str| -> Result<Option<i64>> {
        match param_values(params, key).first() {
            Some(v) => parse_time(v).map(Some),
            None => Ok(None),
        }
    };
    TimeRange::with_defaults(parse("start")?, parse("end")?, DEFAULT_LOOKBACK)
}

fn respond(state: &AppState, endpoint: &str, res: Result<ApiValue>) -> Response {
    let (status, body) = match res {
        Ok(value) => (StatusCode::OK, state.encoder.encode(&value)),
        Err(err) => {
            tracing::warn!(endpoint, error = %err, kind = %err.kind(), "request failed");
            (status_code(err.kind()), state.encoder.encode_error(&err))
        }
    };

    match body {
        Ok(body) => (status, [(header::CONTENT_TYPE, "application/json")], body).into_response(),
        Err(err) => {
            tracing::error!(endpoint, error = %err, "couldn't encode response");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn status_code(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidArgument | ErrorKind::UnsupportedMatcher => StatusCode::BAD_REQUEST,
        ErrorKind::UnsupportedOperation => StatusCode::NOT_IMPLEMENTED,
        ErrorKind::Transport | ErrorKind::Decode => StatusCode::BAD_GATEWAY,
        ErrorKind::Canceled | ErrorKind::Timeout => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Io => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

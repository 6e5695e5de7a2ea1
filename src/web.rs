//! 网页前端：搜索表单、按文件夹分组的结果页、JSON 接口和播放列表下载。

use std::fmt::Write as _;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::aggregator::Aggregator;
use crate::config::MIN_QUERY_CHARS;
use crate::error::SearchError;
use crate::playlist::render_m3u;
use crate::types::SearchOutcome;

#[derive(Clone)]
pub struct WebState {
    pub aggregator: Arc<Aggregator>,
}

impl WebState {
    pub fn new(aggregator: Arc<Aggregator>) -> Self {
        Self { aggregator }
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    query: Option<String>,
}

type ApiError = (StatusCode, Json<Value>);

pub fn build_router(state: WebState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/search", get(search_page))
        .route("/api/search", get(search_json))
        .route("/playlist.m3u", get(playlist))
        .with_state(state)
}

pub async fn serve(bind: &str, state: WebState) -> anyhow::Result<()> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("网页服务已启动: http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

fn validate(params: &SearchParams) -> Result<&str, ApiError> {
    let query = params.query.as_deref().map(str::trim).unwrap_or_default();
    if query.is_empty() {
        return Err(bad_request("Query parameter is required"));
    }
    if query.chars().count() < MIN_QUERY_CHARS {
        return Err(bad_request(&format!(
            "Query must be at least {} characters",
            MIN_QUERY_CHARS
        )));
    }
    Ok(query)
}

fn bad_request(message: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

/// 请求被客户端放弃时，丢弃守卫会取消这次扇出
async fn run_search(state: &WebState, query: &str) -> Result<SearchOutcome, ApiError> {
    let token = CancellationToken::new();
    let _guard = token.clone().drop_guard();

    state
        .aggregator
        .search(query, &token, None)
        .await
        .map_err(|e| match e {
            SearchError::EmptyQuery => bad_request(&e.to_string()),
            other => {
                warn!(error = %other, "网页搜索失败");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": other.to_string() })),
                )
            }
        })
}

async fn index() -> Html<String> {
    Html(render_page(None, None))
}

async fn search_page(
    State(state): State<WebState>,
    Query(params): Query<SearchParams>,
) -> Result<Html<String>, ApiError> {
    let query = validate(&params)?;
    let outcome = run_search(&state, query).await?;
    Ok(Html(render_page(Some(query), Some(&outcome))))
}

async fn search_json(
    State(state): State<WebState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Value>, ApiError> {
    let query = validate(&params)?;
    let outcome = run_search(&state, query).await?;
    Ok(Json(json!({
        "success": true,
        "summary": outcome.summary(),
        "total_files": outcome.total_files(),
        "outcome": outcome,
    })))
}

async fn playlist(
    State(state): State<WebState>,
    Query(params): Query<SearchParams>,
) -> Result<Response, ApiError> {
    let query = validate(&params)?;
    let outcome = run_search(&state, query).await?;
    let body = render_m3u(outcome.files());
    Ok((
        [
            (header::CONTENT_TYPE, "audio/x-mpegurl; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"flixsearch.m3u\"",
            ),
        ],
        body,
    )
        .into_response())
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn render_page(query: Option<&str>, outcome: Option<&SearchOutcome>) -> String {
    let query_value = escape(query.unwrap_or_default());
    let mut html = String::new();
    let _ = write!(
        html,
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>FLIX 聚合搜索</title></head><body>\
         <h1>FLIX 聚合搜索</h1>\
         <form action=\"/search\" method=\"get\">\
         <input name=\"query\" value=\"{}\" minlength=\"{}\" required>\
         <button type=\"submit\">搜索</button></form>",
        query_value, MIN_QUERY_CHARS
    );

    if let Some(outcome) = outcome {
        let _ = write!(html, "<p>{}</p>", escape(&outcome.summary()));
        for failure in &outcome.failures {
            let _ = write!(html, "<p class=\"advisory\">{}</p>", escape(&failure.to_string()));
        }
        if !outcome.is_empty() {
            let _ = write!(
                html,
                "<p><a href=\"/playlist.m3u?query={}\">导出播放列表</a></p>",
                utf8_percent_encode(&outcome.query, NON_ALPHANUMERIC)
            );
        }
        for group in &outcome.groups {
            let _ = write!(
                html,
                "<h2>{}</h2><table><tr><th></th><th>名称</th><th>大小</th><th>服务器</th></tr>",
                escape(&group.folder_name)
            );
            for file in &group.files {
                let _ = write!(
                    html,
                    "<tr><td>{}</td><td><a href=\"{}\">{}</a></td><td>{}</td><td>{}</td></tr>",
                    file.icon(),
                    escape(&file.download_url),
                    escape(&file.file_name),
                    escape(&file.size_label),
                    escape(&file.source_server)
                );
            }
            html.push_str("</table>");
        }
    }

    html.push_str("</body></html>");
    html
}

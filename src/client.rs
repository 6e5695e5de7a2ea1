use std::time::Duration;

use tracing::debug;

use crate::error::{SearchResult, ServerFailure};
use crate::types::{RawResultItem, SearchQuery, SearchRequestBody, SearchResponseBody, ServerConfig};

/// 单台文件索引服务器的搜索客户端
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    timeout: Duration,
}

impl BackendClient {
    pub fn new(timeout: Duration) -> SearchResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("flixsearch/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// 超时覆盖整个请求，包括读取响应体
    pub async fn search(
        &self,
        server: &ServerConfig,
        query: &SearchQuery,
    ) -> Result<Vec<RawResultItem>, ServerFailure> {
        match tokio::time::timeout(self.timeout, self.fetch(server, query)).await {
            Ok(result) => result,
            Err(_) => Err(ServerFailure::timeout(&server.name)),
        }
    }

    async fn fetch(
        &self,
        server: &ServerConfig,
        query: &SearchQuery,
    ) -> Result<Vec<RawResultItem>, ServerFailure> {
        let body = SearchRequestBody::new(server, query);
        debug!(server = %server.name, url = %server.base_url, pattern = %query.pattern, "发送搜索请求");

        let response = self
            .http
            .post(&server.base_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_failure(server, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ServerFailure::unreachable(&server.name, format!("HTTP {}", status)));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| transport_failure(server, e))?;

        parse_search_response(&server.name, &bytes)
    }
}

fn transport_failure(server: &ServerConfig, err: reqwest::Error) -> ServerFailure {
    if err.is_timeout() {
        ServerFailure::timeout(&server.name)
    } else {
        ServerFailure::unreachable(&server.name, err)
    }
}

/// 解析响应体。缺少 `search` 视为空结果；无法解析的条目或没有 href 的条目直接丢弃
pub fn parse_search_response(server: &str, body: &[u8]) -> Result<Vec<RawResultItem>, ServerFailure> {
    let response: SearchResponseBody =
        serde_json::from_slice(body).map_err(|e| ServerFailure::bad_response(server, e))?;

    Ok(response
        .search
        .unwrap_or_default()
        .into_iter()
        .filter_map(|value| serde_json::from_value::<RawResultItem>(value).ok())
        .filter(|item| item.href.is_some())
        .collect())
}

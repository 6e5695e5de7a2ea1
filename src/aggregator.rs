//! 多服务器并发搜索。
//!
//! 每台服务器一个 tokio 任务，任务各自返回结果或失败，全部结束后由协调者
//! 按服务器配置顺序合并，因此最终结果与服务器完成的先后无关。单台服务器的
//! 超时、连接失败或响应错误只记录为提示，不影响其他服务器。

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::BackendClient;
use crate::config::AppConfig;
use crate::error::{SearchError, SearchResult, ServerFailure};
use crate::grouping::group;
use crate::normalize::normalize;
use crate::types::{NormalizedResult, SearchOutcome, SearchQuery, ServerConfig, ServerProgress};

pub type ProgressSender = UnboundedSender<ServerProgress>;

/// 扇出的原始合并结果，尚未分组
#[derive(Debug, Clone, Default)]
pub struct FanOut {
    pub results: Vec<NormalizedResult>,
    pub failures: Vec<ServerFailure>,
}

pub struct Aggregator {
    client: Arc<BackendClient>,
    servers: Arc<[ServerConfig]>,
}

impl Aggregator {
    pub fn new(servers: Vec<ServerConfig>, timeout: Duration) -> SearchResult<Self> {
        Ok(Self {
            client: Arc::new(BackendClient::new(timeout)?),
            servers: servers.into(),
        })
    }

    pub fn from_config(config: &AppConfig) -> SearchResult<Self> {
        Self::new(config.servers.clone(), config.timeout())
    }

    pub fn servers(&self) -> &[ServerConfig] {
        &self.servers
    }

    /// 向所有服务器并发查询，等全部完成或失败后返回合并结果。
    ///
    /// `cancel` 触发后立即返回 [`SearchError::Cancelled`]，未完成的任务被中止，
    /// 之后不再发出任何进度通知。
    pub async fn run(
        &self,
        query: &SearchQuery,
        cancel: &CancellationToken,
        progress: Option<ProgressSender>,
    ) -> SearchResult<FanOut> {
        if cancel.is_cancelled() {
            return Err(SearchError::Cancelled);
        }

        let handles: Vec<_> = self
            .servers
            .iter()
            .cloned()
            .map(|server| {
                let name = server.name.clone();
                let client = self.client.clone();
                let query = query.clone();
                let cancel = cancel.clone();
                let progress = progress.clone();
                let handle = tokio::spawn(async move {
                    query_server(&client, &server, &query, &cancel, progress.as_ref()).await
                });
                (name, handle)
            })
            .collect();

        let mut fan_out = FanOut::default();
        let mut pending = handles.into_iter();

        while let Some((server, mut handle)) = pending.next() {
            let joined = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    handle.abort();
                    pending.by_ref().for_each(|(_, rest)| rest.abort());
                    debug!(pattern = %query.pattern, "搜索已取消，放弃未完成的服务器请求");
                    return Err(SearchError::Cancelled);
                }
                joined = &mut handle => joined,
            };

            match joined {
                Ok(Ok(results)) => fan_out.results.extend(results),
                Ok(Err(failure)) => fan_out.failures.push(failure),
                Err(e) => {
                    warn!(server = %server, error = %e, "服务器查询任务异常终止");
                    fan_out
                        .failures
                        .push(ServerFailure::unreachable(server, format!("任务异常终止: {}", e)));
                }
            }
        }

        Ok(fan_out)
    }

    /// 核心入口：校验关键词、扇出、分组
    pub async fn search(
        &self,
        pattern: &str,
        cancel: &CancellationToken,
        progress: Option<ProgressSender>,
    ) -> SearchResult<SearchOutcome> {
        let query = SearchQuery::new(pattern)?;
        self.search_query(&query, cancel, progress).await
    }

    pub async fn search_query(
        &self,
        query: &SearchQuery,
        cancel: &CancellationToken,
        progress: Option<ProgressSender>,
    ) -> SearchResult<SearchOutcome> {
        let start = Instant::now();
        info!(pattern = %query.pattern, servers = self.servers.len(), "开始聚合搜索");

        let fan_out = self.run(query, cancel, progress).await?;
        let outcome = SearchOutcome {
            query: query.pattern.clone(),
            groups: group(fan_out.results),
            failures: fan_out.failures,
            elapsed_ms: start.elapsed().as_millis() as u64,
        };

        info!(
            pattern = %query.pattern,
            files = outcome.total_files(),
            groups = outcome.groups.len(),
            failures = outcome.failures.len(),
            elapsed_ms = outcome.elapsed_ms,
            "聚合搜索完成"
        );
        Ok(outcome)
    }
}

async fn query_server(
    client: &BackendClient,
    server: &ServerConfig,
    query: &SearchQuery,
    cancel: &CancellationToken,
    progress: Option<&ProgressSender>,
) -> Result<Vec<NormalizedResult>, ServerFailure> {
    let outcome = client.search(server, query).await.map(|items| {
        let received = items.len();
        let kept: Vec<_> = items.iter().filter_map(|item| normalize(server, item)).collect();
        (received, kept)
    });

    // 已取消的搜索不再对外发出通知
    if cancel.is_cancelled() {
        return outcome.map(|(_, kept)| kept);
    }

    let notice = match &outcome {
        Ok((received, kept)) => {
            info!(server = %server.name, received, kept = kept.len(), "服务器已响应");
            ServerProgress::Responded {
                server: server.name.clone(),
                received: *received,
                kept: kept.len(),
            }
        }
        Err(failure) => {
            warn!(server = %server.name, kind = ?failure.kind(), "{}", failure);
            ServerProgress::Failed(failure.clone())
        }
    };
    if let Some(tx) = progress {
        let _ = tx.send(notice);
    }

    outcome.map(|(_, kept)| kept)
}

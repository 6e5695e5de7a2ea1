use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureKind {
    Timeout,
    Unreachable,
    BadResponse,
}

/// 单台服务器的失败；只作为提示与其他服务器的结果一起上报
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind")]
pub enum ServerFailure {
    #[error("{server}: 请求超时")]
    Timeout { server: String },

    #[error("{server}: 无法连接 ({detail})")]
    Unreachable { server: String, detail: String },

    #[error("{server}: 响应无法解析 ({detail})")]
    BadResponse { server: String, detail: String },
}

impl ServerFailure {
    pub fn timeout(server: impl Into<String>) -> Self {
        Self::Timeout {
            server: server.into(),
        }
    }

    pub fn unreachable(server: impl Into<String>, detail: impl ToString) -> Self {
        Self::Unreachable {
            server: server.into(),
            detail: detail.to_string(),
        }
    }

    pub fn bad_response(server: impl Into<String>, detail: impl ToString) -> Self {
        Self::BadResponse {
            server: server.into(),
            detail: detail.to_string(),
        }
    }

    pub fn server(&self) -> &str {
        match self {
            Self::Timeout { server }
            | Self::Unreachable { server, .. }
            | Self::BadResponse { server, .. } => server,
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Timeout { .. } => FailureKind::Timeout,
            Self::Unreachable { .. } => FailureKind::Unreachable,
            Self::BadResponse { .. } => FailureKind::BadResponse,
        }
    }
}

/// 整次搜索层面的错误
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("搜索关键词不能为空")]
    EmptyQuery,

    #[error("搜索已被取消")]
    Cancelled,

    #[error("HTTP 客户端初始化失败: {0}")]
    Client(#[from] reqwest::Error),
}

pub type SearchResult<T> = Result<T, SearchError>;

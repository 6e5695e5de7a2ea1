use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{SearchError, ServerFailure};

/// 文件索引服务器
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub name: String,
    pub base_url: String,
}

impl ServerConfig {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
        }
    }

    /// 服务器搜索根路径，形如 `/DHAKA-FLIX-7/`
    pub fn search_root(&self) -> String {
        format!("/{}/", self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub pattern: String,
    pub case_insensitive: bool,
}

impl SearchQuery {
    /// 空白关键词在扇出之前就被拒绝
    pub fn new(pattern: &str) -> Result<Self, SearchError> {
        let pattern = pattern.trim();
        if pattern.is_empty() {
            return Err(SearchError::EmptyQuery);
        }
        Ok(Self {
            pattern: pattern.to_string(),
            case_insensitive: true,
        })
    }

    pub fn case_sensitive(mut self) -> Self {
        self.case_insensitive = false;
        self
    }
}

/// 服务器返回的原始条目，只在解析响应期间存在
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawResultItem {
    #[serde(default)]
    pub href: Option<String>,
    #[serde(default, rename = "size", deserialize_with = "lenient_size")]
    pub size_bytes: Option<u64>,
}

impl RawResultItem {
    pub fn new(href: impl Into<String>, size_bytes: Option<u64>) -> Self {
        Self {
            href: Some(href.into()),
            size_bytes,
        }
    }
}

// 部分服务器把大小写成浮点数或 null
fn lenient_size<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| {
        v.as_u64()
            .or_else(|| v.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
    }))
}

/// 发往服务器的请求体
#[derive(Debug, Serialize)]
pub struct SearchRequestBody<'a> {
    pub action: &'static str,
    pub search: SearchRequestParams<'a>,
}

#[derive(Debug, Serialize)]
pub struct SearchRequestParams<'a> {
    pub href: String,
    pub pattern: &'a str,
    pub ignorecase: bool,
}

impl<'a> SearchRequestBody<'a> {
    pub fn new(server: &ServerConfig, query: &'a SearchQuery) -> Self {
        Self {
            action: "get",
            search: SearchRequestParams {
                href: server.search_root(),
                pattern: &query.pattern,
                ignorecase: query.case_insensitive,
            },
        }
    }
}

/// 服务器响应体；条目先保留为原始 JSON，逐个宽松解析
#[derive(Debug, Deserialize)]
pub struct SearchResponseBody {
    #[serde(default)]
    pub search: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedResult {
    #[serde(rename = "name")]
    pub file_name: String,
    #[serde(rename = "url")]
    pub download_url: String,
    pub extension: String,
    #[serde(rename = "size")]
    pub size_label: String,
    #[serde(rename = "folder")]
    pub parent_folder: String,
    #[serde(rename = "server")]
    pub source_server: String,
}

impl NormalizedResult {
    pub fn icon(&self) -> &'static str {
        crate::normalize::icon_for(&self.extension)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultGroup {
    #[serde(rename = "folder")]
    pub folder_name: String,
    pub files: Vec<NormalizedResult>,
}

/// 单台服务器的进度通知，仅供观察，不影响结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerProgress {
    Responded {
        server: String,
        received: usize,
        kept: usize,
    },
    Failed(ServerFailure),
}

impl ServerProgress {
    pub fn server(&self) -> &str {
        match self {
            Self::Responded { server, .. } => server,
            Self::Failed(failure) => failure.server(),
        }
    }
}

/// 一次搜索的最终结果：分组后的文件加上各服务器的失败记录
#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    pub query: String,
    pub groups: Vec<ResultGroup>,
    pub failures: Vec<ServerFailure>,
    pub elapsed_ms: u64,
}

impl SearchOutcome {
    pub fn total_files(&self) -> usize {
        self.groups.iter().map(|g| g.files.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn files(&self) -> impl Iterator<Item = &NormalizedResult> {
        self.groups.iter().flat_map(|g| g.files.iter())
    }

    pub fn summary(&self) -> String {
        if self.is_empty() {
            "未找到结果".to_string()
        } else {
            format!(
                "共 {} 个文件，分布在 {} 个文件夹",
                self.total_files(),
                self.groups.len()
            )
        }
    }
}

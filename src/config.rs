use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::types::ServerConfig;

/// 允许的文件类型
pub const ALLOWED_EXTENSIONS: &[&str] = &[".mp3", ".mp4", ".mkv", ".iso", ".zip"];

/// 单台服务器请求超时（秒）
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// 界面层要求的最短关键词长度
pub const MIN_QUERY_CHARS: usize = 3;

/// 局域网默认服务器表
pub static DEFAULT_SERVERS: once_cell::sync::Lazy<Vec<ServerConfig>> =
    once_cell::sync::Lazy::new(|| {
        [7, 8, 9, 12, 14]
            .iter()
            .map(|n| {
                let name = format!("DHAKA-FLIX-{}", n);
                let url = format!("http://172.16.50.{}/{}/", n, name);
                ServerConfig::new(name, url)
            })
            .collect()
    });

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub servers: Vec<ServerConfig>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    REQUEST_TIMEOUT_SECS
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            servers: DEFAULT_SERVERS.clone(),
            timeout_secs: REQUEST_TIMEOUT_SECS,
        }
    }
}

impl AppConfig {
    /// 优先使用显式路径，其次数据目录下的 servers.json，最后是内置服务器表
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let fallback = config_path();
                if fallback.exists() {
                    Self::from_file(&fallback)?
                } else {
                    Self::default()
                }
            }
        };
        config.validate()?;
        info!(servers = config.servers.len(), "服务器配置已加载");
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("读取配置文件失败: {}", path.display()))?;
        Self::from_json(&data).with_context(|| format!("配置文件格式错误: {}", path.display()))
    }

    pub fn from_json(data: &str) -> Result<Self> {
        Ok(serde_json::from_str(data)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.servers.is_empty() {
            bail!("至少需要配置一台服务器");
        }
        if self.timeout_secs == 0 {
            bail!("超时时间必须大于 0");
        }
        let mut seen = HashSet::new();
        for server in &self.servers {
            if server.name.trim().is_empty() {
                bail!("服务器名称不能为空");
            }
            if !seen.insert(server.name.as_str()) {
                bail!("服务器名称重复: {}", server.name);
            }
            if !(server.base_url.starts_with("http://") || server.base_url.starts_with("https://")) {
                bail!("服务器 {} 的地址无效: {}", server.name, server.base_url);
            }
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// 数据保存目录
pub fn data_dir() -> PathBuf {
    let mut p = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    p.push("FlixSearch");
    std::fs::create_dir_all(&p).ok();
    p
}

pub fn config_path() -> PathBuf {
    data_dir().join("servers.json")
}

/// 播放列表默认导出目录
pub fn export_dir() -> PathBuf {
    dirs::download_dir().unwrap_or_else(data_dir)
}

//! FLIX 聚合搜索：把同一个关键词并发发送到局域网内的多台文件索引服务器，
//! 过滤、改写下载地址后按文件夹分组，交给桌面窗口、网页或命令行展示。

pub mod aggregator;
pub mod client;
pub mod config;
pub mod error;
pub mod grouping;
pub mod normalize;
pub mod playlist;
pub mod session;
pub mod types;
pub mod web;

pub use aggregator::{Aggregator, FanOut};
pub use config::AppConfig;
pub use error::{FailureKind, SearchError, ServerFailure};
pub use session::{SearchEvent, SearchSession};
pub use types::{
    NormalizedResult, RawResultItem, ResultGroup, SearchOutcome, SearchQuery, ServerConfig,
    ServerProgress,
};

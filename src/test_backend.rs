//! 本地调试用的文件索引服务器：按 `{"action": "get", "search": {...}}` 协议
//! 在一棵固定的假目录树里按文件名匹配。
//!
//! ```text
//! test_backend --name DHAKA-FLIX-7 --port 8007
//! flixsearch -q matrix -s servers.json
//! ```

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::Json, routing::post, Router};
use clap::Parser;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

#[derive(Parser, Debug)]
#[command(about = "模拟文件索引服务器")]
struct Args {
    /// 服务器名称，决定路由前缀
    #[arg(short = 'n', long = "name", default_value = "DHAKA-FLIX-7")]
    name: String,

    /// 监听端口
    #[arg(short = 'p', long = "port", default_value_t = 8007)]
    port: u16,

    /// 返回路径时不带服务器名前缀
    #[arg(long = "bare-paths")]
    bare_paths: bool,
}

#[derive(Debug, Deserialize)]
struct SearchRequest {
    action: String,
    search: SearchParams,
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    href: String,
    pattern: String,
    #[serde(default)]
    ignorecase: bool,
}

struct Backend {
    name: String,
    bare_paths: bool,
}

// 假目录树：(路径, 字节数)
const TREE: &[(&str, Option<u64>)] = &[
    ("English Movies/The Matrix (1999)/The.Matrix.1999.1080p.mkv", Some(2_147_483_648)),
    ("English Movies/The Matrix (1999)/The.Matrix.1999.srt", Some(98_304)),
    ("English Movies/Heat (1995)/Heat.1995.720p.mp4", Some(1_288_490_188)),
    ("Music/Linkin Park/In The End.mp3", Some(8_650_752)),
    ("Music/Linkin Park/Numb.MP3", None),
    ("Software/Ubuntu/ubuntu-24.04-desktop-amd64.iso", Some(6_114_656_256)),
    ("Software/Tools/matrix-screensaver.zip", Some(1_500)),
    ("Software/Tools/readme.txt", Some(200)),
];

async fn search(
    State(backend): State<Arc<Backend>>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<Value>, StatusCode> {
    if request.action != "get" || request.search.href != format!("/{}/", backend.name) {
        return Err(StatusCode::BAD_REQUEST);
    }

    let params = &request.search;
    let matches = |path: &str| {
        let file = path.rsplit('/').next().unwrap_or(path);
        if params.ignorecase {
            file.to_lowercase().contains(&params.pattern.to_lowercase())
        } else {
            file.contains(&params.pattern)
        }
    };

    let items: Vec<Value> = TREE
        .iter()
        .filter(|(path, _)| matches(path))
        .map(|(path, size)| {
            let encoded = path.replace(' ', "%20");
            let href = if backend.bare_paths {
                format!("/{}", encoded)
            } else {
                format!("/{}/{}", backend.name, encoded)
            };
            match size {
                Some(size) => json!({ "href": href, "size": size }),
                None => json!({ "href": href }),
            }
        })
        .collect();

    info!(pattern = %params.pattern, hits = items.len(), "处理搜索请求");
    Ok(Json(json!({ "search": items })))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_ansi(false)
        .init();

    let args = Args::parse();
    let route = format!("/{}/", args.name);
    let backend = Arc::new(Backend {
        name: args.name,
        bare_paths: args.bare_paths,
    });

    let app = Router::new().route(&route, post(search)).with_state(backend);
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", args.port)).await?;
    info!("模拟服务器已启动: http://{}{}", listener.local_addr()?, route);
    axum::serve(listener, app).await?;
    Ok(())
}

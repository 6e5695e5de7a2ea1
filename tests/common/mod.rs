//! 测试用的文件索引服务器桩。

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};

use flixsearch::ServerConfig;

#[derive(Debug, Clone)]
enum Reply {
    Items(Vec<Value>),
    Status(u16),
    Garbage,
}

/// 桩服务器行为
#[derive(Debug, Clone)]
pub struct Stub {
    name: String,
    reply: Reply,
    delay: Duration,
    slow_pattern: Option<String>,
}

impl Stub {
    pub fn items(name: &str, items: Vec<Value>) -> Self {
        Self {
            name: name.to_string(),
            reply: Reply::Items(items),
            delay: Duration::ZERO,
            slow_pattern: None,
        }
    }

    pub fn status(name: &str, code: u16) -> Self {
        Self {
            reply: Reply::Status(code),
            ..Self::items(name, Vec::new())
        }
    }

    pub fn garbage(name: &str) -> Self {
        Self {
            reply: Reply::Garbage,
            ..Self::items(name, Vec::new())
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// 只有关键词等于 `pattern` 时才延迟
    pub fn delayed_for(mut self, pattern: &str, delay: Duration) -> Self {
        self.slow_pattern = Some(pattern.to_string());
        self.delay = delay;
        self
    }

    /// 在随机端口启动，返回指向它的服务器配置
    pub async fn spawn(self) -> ServerConfig {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let name = self.name.clone();
        let app = Router::new()
            .route(&format!("/{}/", name), post(handle))
            .with_state(Arc::new(self));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        ServerConfig::new(name.clone(), format!("http://{}/{}/", addr, name))
    }
}

async fn handle(State(stub): State<Arc<Stub>>, Json(body): Json<Value>) -> Response {
    // 请求体必须符合协议
    let expected_href = format!("/{}/", stub.name);
    if body["action"] != "get"
        || body["search"]["href"] != expected_href.as_str()
        || !body["search"]["pattern"].is_string()
        || !body["search"]["ignorecase"].is_boolean()
    {
        return StatusCode::UNPROCESSABLE_ENTITY.into_response();
    }

    let slow = match &stub.slow_pattern {
        Some(pattern) => body["search"]["pattern"] == pattern.as_str(),
        None => true,
    };
    if slow && !stub.delay.is_zero() {
        tokio::time::sleep(stub.delay).await;
    }

    match &stub.reply {
        Reply::Items(items) => Json(json!({ "search": items })).into_response(),
        Reply::Status(code) => StatusCode::from_u16(*code).unwrap().into_response(),
        Reply::Garbage => "<html>502 bad gateway</html>".into_response(),
    }
}

/// 一个已关闭的端口，连接会被拒绝
pub async fn closed_server(name: &str) -> ServerConfig {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    ServerConfig::new(name, format!("http://{}/{}/", addr, name))
}

pub fn item(href: &str, size: Option<u64>) -> Value {
    match size {
        Some(size) => json!({ "href": href, "size": size }),
        None => json!({ "href": href }),
    }
}

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use flixsearch::config::MIN_QUERY_CHARS;
use flixsearch::playlist;
use flixsearch::{Aggregator, AppConfig, SearchOutcome, SearchQuery};

#[derive(Parser, Debug)]
#[command(author, version, about = "FLIX 聚合搜索：局域网多服务器文件搜索", long_about = None)]
pub struct CliArgs {
    /// 搜索关键词（提供时以命令行模式运行，不打开窗口）
    #[arg(short = 'q', long = "query")]
    pub query: Option<String>,

    /// 启动网页服务
    #[arg(long = "serve")]
    pub serve: bool,

    /// 网页服务监听地址
    #[arg(long = "bind", default_value = "127.0.0.1:5000")]
    pub bind: String,

    /// 服务器配置文件（JSON）
    #[arg(short = 's', long = "servers")]
    pub servers: Option<PathBuf>,

    /// 单台服务器超时（秒）
    #[arg(short = 't', long = "timeout")]
    pub timeout: Option<u64>,

    /// 区分大小写
    #[arg(long = "case-sensitive")]
    pub case_sensitive: bool,

    /// 以 JSON 输出
    #[arg(long = "json")]
    pub json: bool,

    /// 把结果导出为 M3U 播放列表
    #[arg(short = 'p', long = "playlist")]
    pub playlist: Option<PathBuf>,

    /// 输出调试日志
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

// CLI入口
pub async fn run_cli(args: &CliArgs, config: AppConfig) -> anyhow::Result<()> {
    let pattern = args.query.as_deref().unwrap_or_default().trim();
    if pattern.chars().count() < MIN_QUERY_CHARS {
        anyhow::bail!("关键词至少需要 {} 个字符", MIN_QUERY_CHARS);
    }

    let mut query = SearchQuery::new(pattern)?;
    if args.case_sensitive {
        query = query.case_sensitive();
    }

    let aggregator = Arc::new(Aggregator::from_config(&config)?);
    let token = CancellationToken::new();

    // Ctrl+C 时取消仍在进行的请求
    let ctrl_c_token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c_token.cancel();
        }
    });

    let outcome = aggregator.search_query(&query, &token, None).await?;

    for failure in &outcome.failures {
        eprintln!("[警告] {}", failure);
    }

    if args.json {
        print_json(&outcome)?;
    } else {
        print_text(&outcome);
    }

    if let Some(path) = &args.playlist {
        playlist::write_playlist(outcome.files(), path)?;
        eprintln!("播放列表已保存: {}", path.display());
    }

    Ok(())
}

fn print_json(outcome: &SearchOutcome) -> anyhow::Result<()> {
    let output = json!({
        "code": 0,
        "msg": outcome.summary(),
        "query": outcome.query,
        "total_files": outcome.total_files(),
        "elapsed_ms": outcome.elapsed_ms,
        "groups": outcome.groups,
        "failures": outcome.failures,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_text(outcome: &SearchOutcome) {
    for group in &outcome.groups {
        println!("📁 {} ({})", group.folder_name, group.files.len());
        for file in &group.files {
            println!(
                "  {} {}  [{}] {}",
                file.icon(),
                file.file_name,
                file.size_label,
                file.source_server
            );
            println!("     {}", file.download_url);
        }
    }
    println!("{} ({} ms)", outcome.summary(), outcome.elapsed_ms);
}

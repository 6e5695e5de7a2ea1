mod cli;
mod gui;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use crate::cli::CliArgs;
use flixsearch::web::{self, WebState};
use flixsearch::{Aggregator, AppConfig};

fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    // 初始化日志
    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_ansi(false)
        .init();

    let mut config = AppConfig::load(args.servers.as_deref())?;
    if let Some(timeout) = args.timeout {
        config.timeout_secs = timeout;
        config.validate()?;
    }

    let runtime = tokio::runtime::Runtime::new().context("创建异步运行时失败")?;

    // 1. 命令行模式
    if args.query.is_some() {
        return runtime.block_on(cli::run_cli(&args, config));
    }

    let aggregator = Arc::new(Aggregator::from_config(&config)?);

    // 2. 网页模式
    if args.serve {
        return runtime.block_on(web::serve(&args.bind, WebState::new(aggregator)));
    }

    // 3. 桌面窗口
    gui::run(aggregator, runtime.handle().clone())
}

use std::sync::mpsc::Sender;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::aggregator::Aggregator;
use crate::error::SearchError;
use crate::types::{SearchOutcome, ServerProgress};

/// 发给界面层的事件，均带有所属搜索的代号
#[derive(Debug, Clone)]
pub enum SearchEvent {
    Progress {
        generation: u64,
        progress: ServerProgress,
    },
    Finished {
        generation: u64,
        outcome: SearchOutcome,
    },
    Failed {
        generation: u64,
        message: String,
    },
}

impl SearchEvent {
    pub fn generation(&self) -> u64 {
        match self {
            Self::Progress { generation, .. }
            | Self::Finished { generation, .. }
            | Self::Failed { generation, .. } => *generation,
        }
    }
}

/// 持有"当前搜索"。发起新搜索会取消上一次，旧搜索的结果不会再送达。
pub struct SearchSession {
    aggregator: Arc<Aggregator>,
    runtime: Handle,
    events: Sender<SearchEvent>,
    current: Option<CancellationToken>,
    generation: u64,
}

impl SearchSession {
    pub fn new(aggregator: Arc<Aggregator>, runtime: Handle, events: Sender<SearchEvent>) -> Self {
        Self {
            aggregator,
            runtime,
            events,
            current: None,
            generation: 0,
        }
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    /// 发起搜索并返回其代号
    pub fn start(&mut self, pattern: impl Into<String>) -> u64 {
        self.cancel();
        self.generation += 1;

        let token = CancellationToken::new();
        self.current = Some(token.clone());

        let generation = self.generation;
        let aggregator = self.aggregator.clone();
        let events = self.events.clone();
        let pattern = pattern.into();
        self.runtime
            .spawn(drive(aggregator, pattern, generation, token, events));

        generation
    }

    pub fn cancel(&mut self) {
        if let Some(token) = self.current.take() {
            token.cancel();
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_searching(&self) -> bool {
        self.current.is_some()
    }

    /// 事件是否属于仍在进行的当前搜索
    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.generation && self.current.is_some()
    }

    /// 当前搜索已送达最终结果
    pub fn settle(&mut self, generation: u64) {
        if generation == self.generation {
            self.current = None;
        }
    }
}

impl Drop for SearchSession {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn drive(
    aggregator: Arc<Aggregator>,
    pattern: String,
    generation: u64,
    token: CancellationToken,
    events: Sender<SearchEvent>,
) {
    let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();
    let forward = |progress: ServerProgress| {
        if !token.is_cancelled() {
            let _ = events.send(SearchEvent::Progress {
                generation,
                progress,
            });
        }
    };

    let search = aggregator.search(&pattern, &token, Some(progress_tx));
    tokio::pin!(search);

    let result = loop {
        tokio::select! {
            result = &mut search => break result,
            Some(progress) = progress_rx.recv() => forward(progress),
        }
    };
    while let Ok(progress) = progress_rx.try_recv() {
        forward(progress);
    }

    if token.is_cancelled() {
        debug!(generation, pattern = %pattern, "搜索已被取代，丢弃结果");
        return;
    }

    let event = match result {
        Ok(outcome) => SearchEvent::Finished {
            generation,
            outcome,
        },
        Err(SearchError::Cancelled) => return,
        Err(e) => SearchEvent::Failed {
            generation,
            message: e.to_string(),
        },
    };
    let _ = events.send(event);
}

use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::time::Duration;

use chrono::Timelike;
use eframe::egui;
use tokio::runtime::Handle;
use tracing::{info, warn};

use flixsearch::config::MIN_QUERY_CHARS;
use flixsearch::playlist;
use flixsearch::{Aggregator, SearchEvent, SearchOutcome, SearchSession, ServerProgress};

// 中文字体候选路径，按平台依次探测
const FONT_CANDIDATES: &[&str] = &[
    r"C:\Windows\Fonts\msyh.ttc",
    r"C:\Windows\Fonts\simhei.ttf",
    "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/noto-cjk/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/truetype/wqy/wqy-microhei.ttc",
    "/System/Library/Fonts/PingFang.ttc",
];

pub struct FlixSearchApp {
    query: String,
    session: SearchSession,
    events: Receiver<SearchEvent>,
    outcome: Option<SearchOutcome>,
    progress: Vec<ServerProgress>,
    advisories: Vec<String>,
    status: String,
    server_count: usize,
    is_dark: bool,
}

impl FlixSearchApp {
    pub fn new(cc: &eframe::CreationContext<'_>, aggregator: Arc<Aggregator>, runtime: Handle) -> Self {
        install_fonts(&cc.egui_ctx);

        // 白天(6:00-18:00)浅色，晚上深色
        let hour = chrono::Local::now().hour();
        let is_dark = !(6..18).contains(&hour);
        cc.egui_ctx.set_visuals(visuals(is_dark));

        let (tx, rx) = mpsc::channel();
        let server_count = aggregator.servers().len();

        Self {
            query: String::new(),
            session: SearchSession::new(aggregator, runtime, tx),
            events: rx,
            outcome: None,
            progress: Vec::new(),
            advisories: Vec::new(),
            status: format!("已配置 {} 台服务器", server_count),
            server_count,
            is_dark,
        }
    }

    fn submit(&mut self) {
        let pattern = self.query.trim().to_string();
        if pattern.chars().count() < MIN_QUERY_CHARS {
            self.status = format!("请输入至少 {} 个字符", MIN_QUERY_CHARS);
            return;
        }

        self.outcome = None;
        self.progress.clear();
        self.advisories.clear();
        let generation = self.session.start(pattern.clone());
        info!(generation, pattern = %pattern, "GUI 发起搜索");
        self.status = format!("正在搜索 \"{}\" ...", pattern);
    }

    /// 只接收当前搜索的事件，被取代的搜索即使晚到也直接丢弃
    fn drain_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            if !self.session.is_current(event.generation()) {
                continue;
            }
            match event {
                SearchEvent::Progress { progress, .. } => {
                    if let ServerProgress::Failed(failure) = &progress {
                        self.advisories.push(failure.to_string());
                    }
                    self.progress.push(progress);
                }
                SearchEvent::Finished {
                    generation,
                    outcome,
                } => {
                    self.session.settle(generation);
                    self.status = outcome.summary();
                    self.advisories = outcome.failures.iter().map(|f| f.to_string()).collect();
                    self.outcome = Some(outcome);
                }
                SearchEvent::Failed {
                    generation,
                    message,
                } => {
                    self.session.settle(generation);
                    self.status = message;
                }
            }
        }
    }

    fn export(&mut self) {
        let Some(outcome) = &self.outcome else {
            return;
        };
        self.status = match playlist::export_playlist(outcome.files(), None) {
            Ok(path) => format!("播放列表已导出: {}", path.display()),
            Err(e) => format!("导出失败: {:#}", e),
        };
    }

    fn results_view(&self, ui: &mut egui::Ui) {
        let Some(outcome) = &self.outcome else {
            if self.session.is_searching() {
                ui.centered_and_justified(|ui| {
                    ui.spinner();
                });
            }
            return;
        };

        if outcome.is_empty() {
            ui.centered_and_justified(|ui| {
                ui.label(egui::RichText::new("未找到结果").size(18.0));
            });
            return;
        }

        egui::ScrollArea::vertical()
            .auto_shrink([false; 2])
            .show(ui, |ui| {
                for (index, group) in outcome.groups.iter().enumerate() {
                    let title = format!("📁 {} ({})", group.folder_name, group.files.len());
                    egui::CollapsingHeader::new(title)
                        .default_open(true)
                        .show(ui, |ui| {
                            egui::Grid::new(("group", index))
                                .striped(true)
                                .num_columns(4)
                                .spacing([16.0, 6.0])
                                .show(ui, |ui| {
                                    for file in &group.files {
                                        ui.label(egui::RichText::new(file.icon()).size(18.0));

                                        let link = ui
                                            .link(file.file_name.as_str())
                                            .on_hover_text(file.download_url.as_str());
                                        if link.clicked() {
                                            open_url(file.download_url.clone());
                                        }
                                        // 右键菜单：复制链接
                                        link.context_menu(|ui| {
                                            if ui.button("复制下载链接").clicked() {
                                                ui.output_mut(|o| {
                                                    o.copied_text = file.download_url.clone()
                                                });
                                                ui.close_menu();
                                            }
                                            if ui.button("在浏览器中打开").clicked() {
                                                open_url(file.download_url.clone());
                                                ui.close_menu();
                                            }
                                        });

                                        ui.label(
                                            egui::RichText::new(file.size_label.as_str())
                                                .color(egui::Color32::from_rgb(140, 140, 150)),
                                        );
                                        ui.label(
                                            egui::RichText::new(file.source_server.as_str())
                                                .color(egui::Color32::from_rgb(140, 140, 150)),
                                        );
                                        ui.end_row();
                                    }
                                });
                        });
                }
            });
    }
}

impl eframe::App for FlixSearchApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_events();

        // 搜索进行中持续轮询事件
        if self.session.is_searching() {
            ctx.request_repaint_after(Duration::from_millis(100));
        }

        egui::TopBottomPanel::top("search_bar").show(ctx, |ui| {
            ui.add_space(10.0);
            ui.horizontal(|ui| {
                ui.label(egui::RichText::new("🔍").size(20.0));
                let text_edit = ui.add(
                    egui::TextEdit::singleline(&mut self.query)
                        .hint_text("输入片名、歌曲或文件名...")
                        .desired_width(ui.available_width() - 140.0)
                        .font(egui::FontId::proportional(18.0)),
                );
                let entered = text_edit.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
                if ui.button("搜索").clicked() || entered {
                    self.submit();
                }

                let theme_label = if self.is_dark { "☀" } else { "🌙" };
                if ui.button(theme_label).clicked() {
                    self.is_dark = !self.is_dark;
                    ctx.set_visuals(visuals(self.is_dark));
                }
            });

            ui.add_space(6.0);
            ui.horizontal(|ui| {
                if self.session.is_searching() {
                    ui.spinner();
                    ui.label(format!(
                        "{}/{} 台服务器已响应",
                        self.progress.len(),
                        self.server_count
                    ));
                }
                ui.label(self.status.as_str());
            });
            for advisory in &self.advisories {
                ui.label(
                    egui::RichText::new(format!("⚠ {}", advisory))
                        .size(12.0)
                        .color(egui::Color32::from_rgb(220, 140, 40)),
                );
            }
            ui.add_space(6.0);
        });

        egui::TopBottomPanel::bottom("actions").show(ctx, |ui| {
            ui.add_space(4.0);
            ui.horizontal(|ui| {
                let has_results = self.outcome.as_ref().is_some_and(|o| !o.is_empty());
                if ui
                    .add_enabled(has_results, egui::Button::new("导出播放列表"))
                    .clicked()
                {
                    self.export();
                }
                if let Some(outcome) = &self.outcome {
                    ui.label(
                        egui::RichText::new(format!("耗时 {} ms", outcome.elapsed_ms))
                            .size(12.0)
                            .color(egui::Color32::GRAY),
                    );
                }
            });
            ui.add_space(4.0);
        });

        egui::CentralPanel::default().show(ctx, |ui| self.results_view(ui));
    }
}

fn visuals(is_dark: bool) -> egui::Visuals {
    if is_dark {
        egui::Visuals::dark()
    } else {
        egui::Visuals::light()
    }
}

fn install_fonts(ctx: &egui::Context) {
    let mut fonts = egui::FontDefinitions::default();
    for path in FONT_CANDIDATES {
        if let Ok(data) = std::fs::read(path) {
            fonts
                .font_data
                .insert("cjk".to_owned(), egui::FontData::from_owned(data).into());
            for family in [egui::FontFamily::Proportional, egui::FontFamily::Monospace] {
                if let Some(names) = fonts.families.get_mut(&family) {
                    names.push("cjk".to_owned());
                }
            }
            info!(font = *path, "已加载中文字体");
            break;
        }
    }
    ctx.set_fonts(fonts);
}

// 异步打开，避免阻塞界面
fn open_url(url: String) {
    std::thread::spawn(move || {
        if let Err(e) = open::that(&url) {
            warn!(url = %url, error = %e, "打开下载链接失败");
        }
    });
}

pub fn run(aggregator: Arc<Aggregator>, runtime: Handle) -> anyhow::Result<()> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("FLIX 聚合搜索")
            .with_inner_size([960.0, 680.0])
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        "FLIX 聚合搜索",
        options,
        Box::new(move |cc| Ok(Box::new(FlixSearchApp::new(cc, aggregator, runtime)))),
    )
    .map_err(|e| anyhow::anyhow!("GUI 运行失败: {}", e))
}

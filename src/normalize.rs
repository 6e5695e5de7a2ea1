use percent_encoding::percent_decode_str;

use crate::config::ALLOWED_EXTENSIONS;
use crate::types::{NormalizedResult, RawResultItem, ServerConfig};

/// 把服务器的原始条目转换成可展示、可直接下载的结果。
///
/// 返回 `None` 表示跳过：href 为空，或扩展名不在允许列表中。
pub fn normalize(server: &ServerConfig, item: &RawResultItem) -> Option<NormalizedResult> {
    let href = item.href.as_deref().filter(|h| !h.is_empty())?;

    let extension = extension_of(href);
    if !is_allowed(&extension) {
        return None;
    }

    Some(NormalizedResult {
        file_name: file_name(href),
        download_url: download_url(server, href),
        extension,
        size_label: item
            .size_bytes
            .map(format_size)
            .unwrap_or_else(|| "Unknown".to_string()),
        parent_folder: parent_folder(href),
        source_server: server.name.clone(),
    })
}

pub fn is_allowed(extension: &str) -> bool {
    ALLOWED_EXTENSIONS.contains(&extension)
}

/// 最后一个 `.` 之后的部分，小写并带前导点。没有 `.` 时整段都算作扩展名
pub fn extension_of(href: &str) -> String {
    let tail = href.rsplit('.').next().unwrap_or(href);
    format!(".{}", tail.to_lowercase())
}

/// 有的服务器会在路径里带上自己的名字，有的不会；带了就只去掉一次
pub fn download_url(server: &ServerConfig, href: &str) -> String {
    let base = server.base_url.trim_end_matches('/');
    let prefix = format!("/{}", server.name);
    match href.strip_prefix(prefix.as_str()) {
        Some(rest) => format!("{}{}", base, rest),
        None => format!("{}{}", base, href),
    }
}

pub fn file_name(href: &str) -> String {
    decode(href.rsplit('/').next().unwrap_or(href))
}

pub fn parent_folder(href: &str) -> String {
    let segments: Vec<&str> = href.split('/').filter(|s| !s.is_empty()).collect();
    if segments.len() < 2 {
        return "Root".to_string();
    }
    decode(segments[segments.len() - 2])
}

fn decode(segment: &str) -> String {
    percent_decode_str(segment).decode_utf8_lossy().into_owned()
}

/// 1024 进制，B 到 PB，保留一位小数
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

pub fn icon_for(extension: &str) -> &'static str {
    match extension {
        ".mp4" | ".mkv" | ".avi" => "🎬",
        ".mp3" | ".wav" | ".ogg" => "🎵",
        ".iso" => "💿",
        ".zip" | ".rar" | ".7z" | ".tar" | ".gz" => "📦",
        _ => "📄",
    }
}

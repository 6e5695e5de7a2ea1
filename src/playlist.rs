use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::types::NormalizedResult;

/// 生成 M3U 播放列表文本，每个文件一对 `#EXTINF` 与 URL 行
pub fn render_m3u<'a>(files: impl IntoIterator<Item = &'a NormalizedResult>) -> String {
    let mut out = String::from("#EXTM3U\n");
    for file in files {
        let _ = writeln!(out, "#EXTINF:-1,{}", file.file_name);
        let _ = writeln!(out, "{}", file.download_url);
    }
    out
}

/// 写入带时间戳的播放列表文件，`dir` 为空时使用默认导出目录
pub fn export_playlist<'a>(
    files: impl IntoIterator<Item = &'a NormalizedResult>,
    dir: Option<&Path>,
) -> Result<PathBuf> {
    let dir = dir
        .map(Path::to_path_buf)
        .unwrap_or_else(crate::config::export_dir);
    std::fs::create_dir_all(&dir).with_context(|| format!("创建目录失败: {}", dir.display()))?;

    let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    let path = dir.join(format!("flixsearch-{}.m3u", stamp));
    write_playlist(files, &path)?;
    Ok(path)
}

pub fn write_playlist<'a>(
    files: impl IntoIterator<Item = &'a NormalizedResult>,
    path: &Path,
) -> Result<()> {
    let content = render_m3u(files);
    std::fs::write(path, &content)
        .with_context(|| format!("写入播放列表失败: {}", path.display()))?;
    info!(path = %path.display(), "播放列表已导出");
    Ok(())
}

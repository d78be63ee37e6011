//! 日志工具模块
//!
//! 提供日志初始化、日志文件写入和格式化输出的辅助函数

use anyhow::Result;
use std::fs::{self, OpenOptions};
use std::io::Write;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 初始化控制台日志（带时间戳和级别）
///
/// 优先使用 `RUST_LOG`，否则 verbose 时为 debug，默认 info
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 初始化日志文件
///
/// # 参数
/// - `log_file_path`: 日志文件路径
pub fn init_log_file(log_file_path: &str) -> Result<()> {
    let log_header = format!(
        "{}\n批改日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)?;
    Ok(())
}

/// 向日志文件追加一行
pub fn append_log_line(log_file_path: &str, line: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)?;
    writeln!(
        file,
        "[{}] {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        line
    )?;
    Ok(())
}

/// 记录程序启动信息
pub fn log_startup(input_dir: &str) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 手写作答批改模式");
    info!("📁 输入目录: {}", input_dir);
    info!("{}", "=".repeat(60));
}

/// 记录图片加载信息
pub fn log_images_loaded(total: usize) {
    info!("✓ 找到 {} 张待批改的图片", total);
    info!("💡 按顺序逐张处理，单张失败不影响其余文件\n");
}

/// 打印最终统计信息
///
/// # 参数
/// - `success`: 成功数量
/// - `failed`: 失败数量
/// - `total`: 总数
/// - `log_file_path`: 日志文件路径
pub fn print_final_stats(success: usize, failed: usize, total: usize, log_file_path: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", success, total);
    info!("❌ 失败: {}", failed);
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", log_file_path);
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("abcdef", 3), "abc...");
        assert_eq!(truncate_text("NAD⁺", 10), "NAD⁺");
    }

    #[test]
    fn test_log_file_header_and_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");
        let path = path.to_str().unwrap();

        init_log_file(path).unwrap();
        append_log_line(path, "scan1.jpg | 成功").unwrap();

        let content = fs::read_to_string(path).unwrap();
        assert!(content.contains("批改日志"));
        assert!(content.trim_end().ends_with("scan1.jpg | 成功"));
    }
}

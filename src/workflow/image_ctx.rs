//! 图片处理上下文
//!
//! 封装"我正在处理第几张图片、叫什么"这一信息

use std::fmt::Display;
use std::path::{Path, PathBuf};

/// 图片处理上下文
#[derive(Debug, Clone)]
pub struct ImageCtx {
    /// 图片路径
    pub image_path: PathBuf,

    /// 文件索引（从1开始，仅用于日志显示）
    pub file_index: usize,

    /// 本批文件总数
    pub total: usize,

    /// 不带扩展名的文件名，用于产物命名
    pub stem: String,
}

impl ImageCtx {
    /// 创建新的图片上下文
    pub fn new(image_path: impl Into<PathBuf>, file_index: usize, total: usize) -> Self {
        let image_path = image_path.into();
        let stem = image_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| format!("image_{}", file_index));
        Self {
            image_path,
            file_index,
            total,
            stem,
        }
    }

    pub fn path(&self) -> &Path {
        &self.image_path
    }

    /// 带扩展名的文件名
    pub fn file_name(&self) -> String {
        self.image_path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| self.stem.clone())
    }
}

impl Display for ImageCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[文件 {}/{} {}]",
            self.file_index,
            self.total,
            self.file_name()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stem_and_display() {
        let ctx = ImageCtx::new("input_images/student_07.jpeg", 2, 5);
        assert_eq!(ctx.stem, "student_07");
        assert_eq!(ctx.file_name(), "student_07.jpeg");
        assert_eq!(ctx.to_string(), "[文件 2/5 student_07.jpeg]");
    }
}

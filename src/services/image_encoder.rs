//! 图片编码服务
//!
//! 把图片读成 base64，用于嵌入 Vision 请求

use std::path::Path;

use base64::Engine;
use tokio::fs;

use crate::error::{AppError, AppResult};

/// 支持的图片扩展名
pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// 已编码的图片
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    /// MIME 类型
    pub mime: &'static str,
    /// 标准 base64 编码内容
    pub data: String,
}

impl EncodedImage {
    /// 渲染为 data URL
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, self.data)
    }
}

/// 是否是支持的图片扩展名（忽略大小写）
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
        .unwrap_or(false)
}

fn mime_for(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("png") => "image/png",
        _ => "image/jpeg",
    }
}

/// 读取图片并编码
///
/// 不校验图片内容与大小
pub async fn encode_image(path: &Path) -> AppResult<EncodedImage> {
    let bytes = fs::read(path)
        .await
        .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;

    Ok(EncodedImage {
        mime: mime_for(path),
        data: base64::engine::general_purpose::STANDARD.encode(bytes),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_extensions() {
        assert!(is_supported_image(Path::new("scan.jpg")));
        assert!(is_supported_image(Path::new("scan.JPEG")));
        assert!(is_supported_image(Path::new("scan.Png")));
        assert!(!is_supported_image(Path::new("scan.gif")));
        assert!(!is_supported_image(Path::new("scan")));
    }

    #[test]
    fn test_encode_image_builds_data_url() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("answer.png");
        std::fs::write(&path, b"hello").unwrap();

        let image = tokio_test::block_on(encode_image(&path)).unwrap();

        assert_eq!(image.mime, "image/png");
        assert_eq!(image.data, "aGVsbG8=");
        assert_eq!(image.data_url(), "data:image/png;base64,aGVsbG8=");
    }

    #[test]
    fn test_unreadable_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = tokio_test::block_on(encode_image(&dir.path().join("missing.jpg"))).unwrap_err();
        assert_eq!(err.kind(), "IOError");
    }
}

use crate::error::{AppResult, FileError};
use crate::services::image_encoder::is_supported_image;
use std::path::{Path, PathBuf};
use tokio::fs;

/// 列出目录中所有支持的图片（.jpg/.jpeg/.png）
///
/// 返回文件系统的枚举顺序，需要确定顺序时由调用方自行排序
pub async fn list_input_images(folder: &Path) -> AppResult<Vec<PathBuf>> {
    let dir_error = |source| FileError::DirectoryFailed {
        path: folder.display().to_string(),
        source,
    };

    let mut images = Vec::new();
    let mut entries = fs::read_dir(folder).await.map_err(dir_error)?;

    while let Some(entry) = entries.next_entry().await.map_err(dir_error)? {
        let path = entry.path();
        if path.is_file() && is_supported_image(&path) {
            tracing::debug!(
                "发现图片: {}",
                path.file_name().unwrap_or_default().to_string_lossy()
            );
            images.push(path);
        }
    }

    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs as std_fs;

    #[tokio::test]
    async fn test_lists_only_supported_extensions() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.jpg", "b.JPEG", "c.png", "d.gif", "notes.txt"] {
            std_fs::write(dir.path().join(name), b"x").unwrap();
        }
        std_fs::create_dir(dir.path().join("nested.png")).unwrap();

        let mut names: Vec<String> = list_input_images(dir.path())
            .await
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        names.sort();

        assert_eq!(names, vec!["a.jpg", "b.JPEG", "c.png"]);
    }

    #[tokio::test]
    async fn test_missing_folder_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = list_input_images(&dir.path().join("missing")).await;
        assert!(result.is_err());
    }
}

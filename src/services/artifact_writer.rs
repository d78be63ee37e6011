//! 产物写入服务 - 业务能力层
//!
//! 只负责把每个阶段的结果写到对应目录，不关心流程

use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::fs;
use tracing::debug;

use crate::config::Config;
use crate::error::{AppError, AppResult, FileError};
use crate::models::analysis::AnalysisResult;
use crate::models::validation::ValidationResult;

/// 产物写入服务
///
/// 文件名为 `<图片名>_analysis.json` / `<图片名>_feedback.txt` / `<图片名>_validation.json`，
/// 目录不存在时自动创建，重复运行直接覆盖
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    analysis_dir: PathBuf,
    feedback_dir: PathBuf,
    validation_dir: PathBuf,
}

impl ArtifactWriter {
    /// 使用配置中的输出目录创建
    pub fn new(config: &Config) -> Self {
        Self::with_dirs(&config.analysis_dir, &config.feedback_dir, &config.validation_dir)
    }

    /// 使用自定义目录创建
    pub fn with_dirs(
        analysis_dir: impl Into<PathBuf>,
        feedback_dir: impl Into<PathBuf>,
        validation_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            analysis_dir: analysis_dir.into(),
            feedback_dir: feedback_dir.into(),
            validation_dir: validation_dir.into(),
        }
    }

    /// 创建三个输出目录
    pub async fn ensure_dirs(&self) -> AppResult<()> {
        for dir in [&self.analysis_dir, &self.feedback_dir, &self.validation_dir] {
            fs::create_dir_all(dir).await.map_err(|source| FileError::DirectoryFailed {
                path: dir.display().to_string(),
                source,
            })?;
        }
        Ok(())
    }

    pub fn analysis_path(&self, stem: &str) -> PathBuf {
        self.analysis_dir.join(format!("{}_analysis.json", stem))
    }

    pub fn feedback_path(&self, stem: &str) -> PathBuf {
        self.feedback_dir.join(format!("{}_feedback.txt", stem))
    }

    pub fn validation_path(&self, stem: &str) -> PathBuf {
        self.validation_dir.join(format!("{}_validation.json", stem))
    }

    pub async fn write_analysis(&self, stem: &str, result: &AnalysisResult) -> AppResult<PathBuf> {
        let path = self.analysis_path(stem);
        write_json(&path, result).await?;
        Ok(path)
    }

    pub async fn write_feedback(&self, stem: &str, feedback: &str) -> AppResult<PathBuf> {
        let path = self.feedback_path(stem);
        write_text(&path, feedback).await?;
        Ok(path)
    }

    pub async fn write_validation(
        &self,
        stem: &str,
        result: &ValidationResult,
    ) -> AppResult<PathBuf> {
        let path = self.validation_path(stem);
        write_json(&path, result).await?;
        Ok(path)
    }
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> AppResult<()> {
    let content = serde_json::to_string_pretty(value).map_err(|source| {
        FileError::SerializeFailed {
            path: path.display().to_string(),
            source,
        }
    })?;
    write_text(path, &content).await
}

async fn write_text(path: &Path, content: &str) -> AppResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await.map_err(|source| FileError::DirectoryFailed {
            path: parent.display().to_string(),
            source,
        })?;
    }

    debug!("写入产物: {} ({} 字节)", path.display(), content.len());

    fs::write(path, content)
        .await
        .map_err(|e| AppError::file_write_failed(path.display().to_string(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn test_writes_named_artifacts() {
        let root = tempfile::tempdir().unwrap();
        let writer = ArtifactWriter::with_dirs(
            root.path().join("analysis"),
            root.path().join("feedback"),
            root.path().join("validation"),
        );
        writer.ensure_dirs().await.unwrap();

        let analysis = AnalysisResult {
            teacher_score: "1/2".to_string(),
            rubric_points: BTreeMap::from([("A".to_string(), true)]),
            ..Default::default()
        };
        let path = writer.write_analysis("scan1", &analysis).await.unwrap();
        assert!(path.ends_with("analysis/scan1_analysis.json"));
        let stored: AnalysisResult =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(stored, analysis);

        let path = writer.write_feedback("scan1", "Good work.").await.unwrap();
        assert!(path.ends_with("feedback/scan1_feedback.txt"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "Good work.");
    }

    #[tokio::test]
    async fn test_missing_dirs_are_created_on_demand() {
        let root = tempfile::tempdir().unwrap();
        let writer = ArtifactWriter::with_dirs(
            root.path().join("a"),
            root.path().join("f"),
            root.path().join("v"),
        );

        let path = writer.write_feedback("scan", "text").await.unwrap();
        assert!(path.exists());
    }
}

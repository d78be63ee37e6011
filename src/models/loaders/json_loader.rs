use crate::error::ConfigError;
use serde::de::DeserializeOwned;
use std::path::Path;
use tokio::fs;

/// 读取并解析一个 JSON 配置文档
pub async fn load_json_document<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let content = fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::DocumentMissing {
            path: path.display().to_string(),
            source,
        })?;

    let document = serde_json::from_str(&content).map_err(|e| ConfigError::DocumentMalformed {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    tracing::debug!("已加载配置文件: {}", path.display());

    Ok(document)
}

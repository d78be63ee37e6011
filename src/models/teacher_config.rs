//! 教师配置（偏好与反馈校验要点）
//!
//! 启动时从两个 JSON 文档加载一次，之后只读

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ConfigError;
use crate::models::loaders::load_json_document;

/// 偏好文件名
pub const PREFERENCES_FILE: &str = "preferences.json";
/// 反馈要点文件名
pub const FEEDBACK_INSIGHTS_FILE: &str = "feedback_insights.json";

/// 教师的批改偏好（扁平键值）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    /// 反馈目标字数
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word_limit: Option<u32>,
    /// 其余偏好原样保留
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// 反馈校验要点
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedbackInsights {
    pub validation_criteria: Map<String, Value>,
    pub rubric_evaluation: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// 教师配置
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TeacherConfig {
    preferences: Preferences,
    feedback_insights: FeedbackInsights,
}

impl TeacherConfig {
    pub fn new(preferences: Preferences, feedback_insights: FeedbackInsights) -> Self {
        Self {
            preferences,
            feedback_insights,
        }
    }

    /// 从目录加载两个配置文档，任一缺失或格式错误即失败
    pub async fn load(dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let dir = dir.as_ref();
        let preferences: Preferences = load_json_document(&dir.join(PREFERENCES_FILE)).await?;
        let feedback_insights: FeedbackInsights =
            load_json_document(&dir.join(FEEDBACK_INSIGHTS_FILE)).await?;

        if preferences.word_limit == Some(0) {
            return Err(ConfigError::DocumentMalformed {
                path: dir.join(PREFERENCES_FILE).display().to_string(),
                reason: "word_limit 必须为正整数".to_string(),
            });
        }

        Ok(Self::new(preferences, feedback_insights))
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    /// `validation_criteria` 子对象
    pub fn feedback_criteria(&self) -> &Map<String, Value> {
        &self.feedback_insights.validation_criteria
    }

    /// `rubric_evaluation` 子对象
    pub fn rubric_rules(&self) -> &Map<String, Value> {
        &self.feedback_insights.rubric_evaluation
    }
}

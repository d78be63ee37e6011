use crate::error::ConfigError;
use crate::services::response_parser::RubricKeyPolicy;

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 待批改图片目录
    pub input_dir: String,
    /// 分析结果输出目录
    pub analysis_dir: String,
    /// 反馈文本输出目录
    pub feedback_dir: String,
    /// 校验结果输出目录
    pub validation_dir: String,
    /// 教师配置（preferences.json / feedback_insights.json）所在目录
    pub teacher_config_dir: String,
    /// 评分点键名策略
    pub rubric_key_policy: RubricKeyPolicy,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub analysis_model: String,
    pub feedback_model: String,
    pub validation_model: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_dir: "input_images".to_string(),
            analysis_dir: "analysis_output".to_string(),
            feedback_dir: "feedback_output".to_string(),
            validation_dir: "validation_output".to_string(),
            teacher_config_dir: "config".to_string(),
            rubric_key_policy: RubricKeyPolicy::Closed,
            verbose_logging: false,
            output_log_file: "grading_log.txt".to_string(),
            llm_api_key: String::new(),
            llm_api_base_url: "https://api.openai.com/v1".to_string(),
            analysis_model: "gpt-4o".to_string(),
            feedback_model: "gpt-4".to_string(),
            validation_model: "gpt-4o".to_string(),
        }
    }
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// `OPENAI_API_KEY` 必须存在，其余变量缺省时使用默认值。
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 使用自定义的变量查找函数加载配置，便于测试
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let default = Self::default();

        let llm_api_key = lookup("OPENAI_API_KEY")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::EnvVarNotFound {
                var_name: "OPENAI_API_KEY".to_string(),
            })?;

        let verbose_logging = match lookup("VERBOSE_LOGGING") {
            Some(v) => v.parse().map_err(|_| ConfigError::EnvVarParseFailed {
                var_name: "VERBOSE_LOGGING".to_string(),
                value: v.clone(),
                expected_type: "bool".to_string(),
            })?,
            None => default.verbose_logging,
        };

        let rubric_key_policy = match lookup("RUBRIC_KEY_POLICY") {
            Some(v) => v.parse().map_err(|_| ConfigError::EnvVarParseFailed {
                var_name: "RUBRIC_KEY_POLICY".to_string(),
                value: v.clone(),
                expected_type: "closed|open".to_string(),
            })?,
            None => default.rubric_key_policy,
        };

        Ok(Self {
            input_dir: lookup("INPUT_DIR").unwrap_or(default.input_dir),
            analysis_dir: lookup("ANALYSIS_DIR").unwrap_or(default.analysis_dir),
            feedback_dir: lookup("FEEDBACK_DIR").unwrap_or(default.feedback_dir),
            validation_dir: lookup("VALIDATION_DIR").unwrap_or(default.validation_dir),
            teacher_config_dir: lookup("TEACHER_CONFIG_DIR").unwrap_or(default.teacher_config_dir),
            rubric_key_policy,
            verbose_logging,
            output_log_file: lookup("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
            llm_api_key,
            llm_api_base_url: lookup("LLM_API_BASE_URL").unwrap_or(default.llm_api_base_url),
            analysis_model: lookup("ANALYSIS_MODEL").unwrap_or(default.analysis_model),
            feedback_model: lookup("FEEDBACK_MODEL").unwrap_or(default.feedback_model),
            validation_model: lookup("VALIDATION_MODEL").unwrap_or(default.validation_model),
        })
    }
}

use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 配置错误（启动阶段致命）
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// LLM 服务错误
    #[error("LLM错误: {0}")]
    Llm(#[from] LlmError),
    /// 分析结果解析失败
    #[error("分析结果解析失败: {0}")]
    Parse(#[source] ParseError),
    /// 校验结果解析失败
    #[error("校验结果解析失败: {0}")]
    ValidationParse(#[source] ParseError),
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 环境变量不存在
    #[error("环境变量 {var_name} 不存在")]
    EnvVarNotFound { var_name: String },
    /// 配置文档不存在或无法读取
    #[error("无法读取配置文件 {path}: {source}")]
    DocumentMissing {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 配置文档格式错误
    #[error("配置文件 {path} 格式错误: {reason}")]
    DocumentMalformed { path: String, reason: String },
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 读取文件失败
    #[error("读取文件失败 {path}: {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 写入文件失败
    #[error("写入文件失败 {path}: {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 目录操作失败
    #[error("目录操作失败 {path}: {source}")]
    DirectoryFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 序列化产物失败
    #[error("序列化失败 {path}: {source}")]
    SerializeFailed {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// LLM 服务错误
#[derive(Debug, Error)]
pub enum LlmError {
    /// 构建请求失败
    #[error("构建请求失败 (模型: {model}): {source}")]
    RequestBuildFailed {
        model: String,
        #[source]
        source: BoxError,
    },
    /// API 调用失败（网络、鉴权、限流等）
    #[error("API 调用失败 (模型: {model}): {source}")]
    ApiCallFailed {
        model: String,
        #[source]
        source: BoxError,
    },
    /// 返回内容为空
    #[error("LLM 返回内容为空 (模型: {model})")]
    EmptyResponse { model: String },
}

/// 模型回复解析错误
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// 回复中没有 JSON 对象
    #[error("no JSON object found")]
    NoJsonObject,
    /// 找到了对象但无法解码
    #[error("could not parse as JSON: {0}")]
    InvalidJson(String),
    /// 三层解析都没有恢复出任何字段
    #[error("no analysis fields could be recovered")]
    NothingRecovered,
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建文件读取错误
    pub fn file_read_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source,
        })
    }

    /// 创建文件写入错误
    pub fn file_write_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.into(),
            source,
        })
    }

    /// 创建LLM API调用错误
    pub fn llm_api_failed(
        model: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        AppError::Llm(LlmError::ApiCallFailed {
            model: model.into(),
            source: source.into(),
        })
    }

    /// 错误所属的类别名，用于日志
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Config(_) => "ConfigLoadError",
            AppError::File(_) => "IOError",
            AppError::Llm(_) => "ModelRequestError",
            AppError::Parse(_) => "ParseError",
            AppError::ValidationParse(_) => "ValidationParseError",
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

//! LLM 服务 - 业务能力层
//!
//! 只负责"发一次请求、拿回一段文本"，不关心提示词内容和流程
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 支持自定义 API 端点和模型
//! - 兼容 OpenAI API 的服务
//!
//! 各阶段只依赖 [`ChatModel`] trait，客户端在启动时显式创建后注入，
//! 测试时可以换成固定回复的桩实现。

use std::future::Future;

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartImage,
        ChatCompletionRequestMessageContentPartText, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, ChatCompletionRequestUserMessageContent,
        ChatCompletionRequestUserMessageContentPart, CreateChatCompletionRequestArgs, ImageDetail,
        ImageUrl,
    },
    Client,
};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, LlmError};
use crate::services::image_encoder::EncodedImage;

/// 单次聊天请求
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    /// 模型名称
    pub model: String,
    /// 用户消息
    pub user_message: String,
    /// 系统消息（可选）
    pub system_message: Option<String>,
    /// 随用户消息一起发送的图片（可选）
    pub image: Option<EncodedImage>,
    /// 采样温度
    pub temperature: f32,
    /// 最大输出 token 数
    pub max_tokens: u32,
}

impl ChatRequest {
    /// 纯文本请求
    pub fn text(model: impl Into<String>, user_message: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            user_message: user_message.into(),
            system_message: None,
            image: None,
            temperature: 0.0,
            max_tokens: 1024,
        }
    }

    pub fn with_system(mut self, system_message: impl Into<String>) -> Self {
        self.system_message = Some(system_message.into());
        self
    }

    pub fn with_image(mut self, image: EncodedImage) -> Self {
        self.image = Some(image);
        self
    }

    pub fn with_sampling(mut self, temperature: f32, max_tokens: u32) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }
}

/// 聊天模型能力
pub trait ChatModel {
    /// 发送一次请求，返回回复文本
    fn complete(&self, request: ChatRequest) -> impl Future<Output = AppResult<String>> + Send;
}

/// 基于 OpenAI 兼容接口的 LLM 服务
pub struct LlmService {
    client: Client<OpenAIConfig>,
}

impl LlmService {
    /// 创建新的 LLM 服务
    pub fn new(config: &Config) -> Self {
        // 配置 OpenAI 客户端（兼容 OpenAI API 的服务）
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        Self {
            client: Client::with_config(openai_config),
        }
    }

    /// 构建消息列表
    ///
    /// 有图片时用户消息为"文本 + 图片"的多部分内容，否则为纯文本
    fn build_messages(request: &ChatRequest) -> AppResult<Vec<ChatCompletionRequestMessage>> {
        let build_failed = |e: async_openai::error::OpenAIError| {
            AppError::Llm(LlmError::RequestBuildFailed {
                model: request.model.clone(),
                source: Box::new(e),
            })
        };

        let mut messages = Vec::new();

        if let Some(sys_msg) = &request.system_message {
            let system_msg = ChatCompletionRequestSystemMessageArgs::default()
                .content(sys_msg.as_str())
                .build()
                .map_err(build_failed)?;
            messages.push(ChatCompletionRequestMessage::System(system_msg));
        }

        let user_msg = match &request.image {
            Some(image) => {
                let content_parts = vec![
                    ChatCompletionRequestUserMessageContentPart::Text(
                        ChatCompletionRequestMessageContentPartText {
                            text: request.user_message.clone(),
                        },
                    ),
                    ChatCompletionRequestUserMessageContentPart::ImageUrl(
                        ChatCompletionRequestMessageContentPartImage {
                            image_url: ImageUrl {
                                url: image.data_url(),
                                detail: Some(ImageDetail::High),
                            },
                        },
                    ),
                ];

                debug!("使用 Vision API，图片类型: {}", image.mime);

                ChatCompletionRequestUserMessageArgs::default()
                    .content(ChatCompletionRequestUserMessageContent::Array(content_parts))
                    .build()
                    .map_err(build_failed)?
            }
            None => ChatCompletionRequestUserMessageArgs::default()
                .content(request.user_message.as_str())
                .build()
                .map_err(build_failed)?,
        };

        messages.push(ChatCompletionRequestMessage::User(user_msg));

        Ok(messages)
    }

    async fn send(&self, request: ChatRequest) -> AppResult<String> {
        debug!("调用 LLM API，模型: {}", request.model);
        debug!("用户消息长度: {} 字符", request.user_message.len());

        let messages = Self::build_messages(&request)?;

        let api_request = CreateChatCompletionRequestArgs::default()
            .model(&request.model)
            .messages(messages)
            .temperature(request.temperature)
            .max_tokens(request.max_tokens)
            .build()
            .map_err(|e| {
                AppError::Llm(LlmError::RequestBuildFailed {
                    model: request.model.clone(),
                    source: Box::new(e),
                })
            })?;

        let response = self.client.chat().create(api_request).await.map_err(|e| {
            warn!("LLM API 调用失败: {}", e);
            AppError::llm_api_failed(&request.model, e)
        })?;

        debug!("LLM API 调用成功");

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| {
                AppError::Llm(LlmError::EmptyResponse {
                    model: request.model.clone(),
                })
            })?;

        Ok(content.trim().to_string())
    }
}

impl ChatModel for LlmService {
    fn complete(&self, request: ChatRequest) -> impl Future<Output = AppResult<String>> + Send {
        self.send(request)
    }
}

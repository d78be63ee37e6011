//! 分析阶段 - 业务能力层
//!
//! 图片 + 题目/评分标准 → 模型 → 结构化分析结果

use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};
use crate::models::analysis::AnalysisResult;
use crate::models::context::GradingContext;
use crate::services::image_encoder::encode_image;
use crate::services::llm_service::{ChatModel, ChatRequest};
use crate::services::response_parser::{parse_analysis, Parsed, RubricKeyPolicy};
use crate::utils::logging::truncate_text;

/// 分析请求采样温度（确定性）
pub const ANALYSIS_TEMPERATURE: f32 = 0.0;
/// 分析请求最大输出长度
pub const ANALYSIS_MAX_TOKENS: u32 = 3000;

const ANALYSIS_SYSTEM_MESSAGE: &str = "You are an experienced teacher grading handwritten \
student responses. Transcribe the handwriting exactly and judge it strictly against the rubric.";

/// 分析阶段
pub struct AnalysisStage<M> {
    model: Arc<M>,
    model_name: String,
    policy: RubricKeyPolicy,
}

impl<M: ChatModel> AnalysisStage<M> {
    pub fn new(model: Arc<M>, model_name: impl Into<String>, policy: RubricKeyPolicy) -> Self {
        Self {
            model,
            model_name: model_name.into(),
            policy,
        }
    }

    /// 分析一张作答图片
    pub async fn analyze(
        &self,
        image_path: &Path,
        context: &GradingContext,
    ) -> AppResult<Parsed<AnalysisResult>> {
        let image = encode_image(image_path).await?;
        debug!("图片编码完成，长度: {} 字符", image.data.len());

        let request = ChatRequest::text(&self.model_name, build_analysis_prompt(context))
            .with_system(ANALYSIS_SYSTEM_MESSAGE)
            .with_image(image)
            .with_sampling(ANALYSIS_TEMPERATURE, ANALYSIS_MAX_TOKENS);

        let reply = self.model.complete(request).await?;
        info!("📝 模型原始回复: {}", truncate_text(&reply, 300));
        debug!("模型原始回复（完整）: {}", reply);

        let parsed = parse_analysis(&reply, context, self.policy).map_err(AppError::Parse)?;
        if !parsed.is_complete() {
            warn!(
                "⚠️ 分析结果不完整（{:?}），缺失字段: {}",
                parsed.tier,
                parsed.missing.join(", ")
            );
        }

        Ok(parsed)
    }
}

/// 构建分析提示词
///
/// 评分点模板按上下文中的评分点生成 `"<label>": true/false`
pub fn build_analysis_prompt(context: &GradingContext) -> String {
    let total = context.rubric_points.len().max(1);

    let rubric_template = context
        .rubric_points
        .iter()
        .map(|point| format!("        {}: true/false", Value::String(point.label.clone())))
        .collect::<Vec<_>>()
        .join(",\n");

    let rubric_list = bullet_list(context.rubric_points.iter().map(|p| p.label.as_str()));
    let notes_list = bullet_list(context.grading_notes.iter().map(String::as_str));

    format!(
        r#"QUESTION
{question}

RUBRIC (one point per item)
{rubric_list}

GRADING NOTES
{notes_list}

Analyze the handwritten student response in the image and return a JSON object with:
{{
    "student_response": "verbatim text",
    "teacher_score": "x/{total}",
    "rubric_points": {{
{rubric_template}
    }},
    "misconceptions": ["list of errors"],
    "points_earned": ["list of earned rubric points"]
}}

Use exactly the rubric keys shown above. Return only the JSON object."#,
        question = context.question,
    )
}

pub(crate) fn bullet_list<'a>(items: impl Iterator<Item = &'a str>) -> String {
    let lines: Vec<String> = items.map(|item| format!("- {}", item)).collect();
    if lines.is_empty() {
        "- (none)".to_string()
    } else {
        lines.join("\n")
    }
}

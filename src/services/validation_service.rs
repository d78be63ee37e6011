//! 反馈校验阶段 - 业务能力层
//!
//! 让模型按八项固定标准逐项给出 Y/N，再计算百分制得分

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{AppError, AppResult};
use crate::models::context::GradingContext;
use crate::models::teacher_config::TeacherConfig;
use crate::models::validation::{ValidationCriterion, ValidationResult};
use crate::services::llm_service::{ChatModel, ChatRequest};
use crate::services::response_parser::parse_validation;

/// 校验请求采样温度（确定性）
pub const VALIDATION_TEMPERATURE: f32 = 0.0;
/// 校验请求最大输出长度
pub const VALIDATION_MAX_TOKENS: u32 = 1000;

/// 反馈校验阶段
pub struct ValidationStage<M> {
    model: Arc<M>,
    model_name: String,
}

impl<M: ChatModel> ValidationStage<M> {
    pub fn new(model: Arc<M>, model_name: impl Into<String>) -> Self {
        Self {
            model,
            model_name: model_name.into(),
        }
    }

    /// 校验一段反馈
    pub async fn validate(
        &self,
        feedback: &str,
        rubric_points: &BTreeMap<String, bool>,
        teacher_config: &TeacherConfig,
        context: &GradingContext,
    ) -> AppResult<ValidationResult> {
        let prompt = build_validation_prompt(feedback, rubric_points, teacher_config, context);
        let request = ChatRequest::text(&self.model_name, prompt)
            .with_sampling(VALIDATION_TEMPERATURE, VALIDATION_MAX_TOKENS);

        let reply = self.model.complete(request).await?;
        debug!("校验原始回复: {}", reply);

        let parsed = parse_validation(&reply).map_err(AppError::ValidationParse)?;
        if !parsed.is_complete() {
            warn!(
                "⚠️ 校验回复缺少 {} 项判定，按未通过处理: {}",
                parsed.missing.len(),
                parsed.missing.join(", ")
            );
        }

        Ok(parsed.value)
    }
}

/// 构建校验提示词
pub fn build_validation_prompt(
    feedback: &str,
    rubric_points: &BTreeMap<String, bool>,
    teacher_config: &TeacherConfig,
    context: &GradingContext,
) -> String {
    let criteria = ValidationCriterion::ALL
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{}. {} ({}): {}", i + 1, c.label(), c.key(), c.question()))
        .collect::<Vec<_>>()
        .join("\n");

    let rubric_status = rubric_points
        .iter()
        .map(|(key, earned)| format!("- {}: {}", key, if *earned { "earned" } else { "missed" }))
        .collect::<Vec<_>>()
        .join("\n");

    let answer_template = ValidationCriterion::ALL
        .iter()
        .map(|c| format!("    \"{}\": \"Y or N\",", c.key()))
        .collect::<Vec<_>>()
        .join("\n");

    let teacher_criteria = pretty(teacher_config.feedback_criteria());
    let rubric_rules = pretty(teacher_config.rubric_rules());

    format!(
        r#"You are reviewing feedback written for a student.

QUESTION
{question}

RUBRIC STATUS
{rubric_status}

TEACHER VALIDATION CRITERIA
{teacher_criteria}

TEACHER RUBRIC RULES
{rubric_rules}

FEEDBACK TO REVIEW
{feedback}

Judge the feedback against each criterion:
{criteria}

Respond with a strict JSON object and nothing else:
{{
{answer_template}
    "explanations": {{
        "<criterion key>": "why it failed (only for criteria answered N)"
    }}
}}"#,
        question = context.question,
    )
}

fn pretty(map: &serde_json::Map<String, Value>) -> String {
    serde_json::to_string_pretty(map).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::teacher_config::{FeedbackInsights, Preferences};
    use serde_json::json;

    #[test]
    fn test_validation_prompt_lists_all_criteria() {
        let mut insights = FeedbackInsights::default();
        insights
            .validation_criteria
            .insert("tone".to_string(), json!("second person"));
        let teacher = TeacherConfig::new(Preferences::default(), insights);
        let ctx = GradingContext::new("Why?", vec!["A"], Vec::<String>::new(), 50);
        let rubric = BTreeMap::from([("A".to_string(), false)]);

        let prompt = build_validation_prompt("You explain well.", &rubric, &teacher, &ctx);

        for criterion in ValidationCriterion::ALL {
            assert!(prompt.contains(&format!("\"{}\": \"Y or N\"", criterion.key())));
        }
        assert!(prompt.contains("- A: missed"));
        assert!(prompt.contains("second person"));
        assert!(prompt.contains("You explain well."));
    }
}

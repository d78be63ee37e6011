//! 反馈生成阶段 - 业务能力层
//!
//! 分析结果 + 教师偏好 → 面向学生的个性化反馈

use std::sync::Arc;

use tracing::debug;

use crate::error::AppResult;
use crate::models::analysis::AnalysisResult;
use crate::models::context::GradingContext;
use crate::models::teacher_config::Preferences;
use crate::services::analysis_service::bullet_list;
use crate::services::llm_service::{ChatModel, ChatRequest};

/// 反馈生成采样温度（允许变化）
pub const FEEDBACK_TEMPERATURE: f32 = 0.7;
/// 反馈生成最大输出长度
pub const FEEDBACK_MAX_TOKENS: u32 = 500;

/// 反馈生成阶段
pub struct FeedbackStage<M> {
    model: Arc<M>,
    model_name: String,
}

impl<M: ChatModel> FeedbackStage<M> {
    pub fn new(model: Arc<M>, model_name: impl Into<String>) -> Self {
        Self {
            model,
            model_name: model_name.into(),
        }
    }

    /// 生成反馈，原样返回模型回复
    pub async fn generate_feedback(
        &self,
        result: &AnalysisResult,
        context: &GradingContext,
        preferences: &Preferences,
    ) -> AppResult<String> {
        let prompt = build_feedback_prompt(result, context, preferences);
        let request = ChatRequest::text(&self.model_name, prompt)
            .with_sampling(FEEDBACK_TEMPERATURE, FEEDBACK_MAX_TOKENS);

        let feedback = self.model.complete(request).await?;
        debug!("反馈长度: {} 词", feedback.split_whitespace().count());

        Ok(feedback)
    }
}

/// 构建反馈提示词
pub fn build_feedback_prompt(
    result: &AnalysisResult,
    context: &GradingContext,
    preferences: &Preferences,
) -> String {
    let status = result
        .rubric_status(context)
        .iter()
        .map(|(key, earned)| {
            format!("- {}: {}", key, if *earned { "addressed" } else { "missing" })
        })
        .collect::<Vec<_>>()
        .join("\n");

    let rubric_list = bullet_list(context.rubric_points.iter().map(|p| p.label.as_str()));
    let notes_list = bullet_list(context.grading_notes.iter().map(String::as_str));
    let misconceptions = bullet_list(result.misconceptions.iter().map(String::as_str));

    let teacher_preferences = if preferences.extra.is_empty() {
        "- (none)".to_string()
    } else {
        preferences
            .extra
            .iter()
            .map(|(key, value)| match value.as_str() {
                Some(text) => format!("- {}: {}", key, text),
                None => format!("- {}: {}", key, value),
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    let word_limit = context.word_limit;

    format!(
        r#"CONTEXT
Question: {question}
Rubric:
{rubric_list}

Grading notes:
{notes_list}

Student Response: {student_response}
Score: {score}
Word Limit: {word_limit}

INSTRUCTIONS
1. Use the analysis to see which rubric points the student addressed or missed:
{status}

Recorded misconceptions:
{misconceptions}

2. Generate ~{word_limit} word feedback that:
   - Acknowledges the rubric points the student earned
   - Targets 1-2 key missing concepts
   - Links to fundamental principles
   - Uses direct, personal language ("You explain...")
   - Maintains precise subject terminology

STYLE GUIDANCE
- Direct, conversational academic tone
- Focus on understanding gaps
- No study suggestions
- Cite the earned and missing points explicitly

TEACHER PREFERENCES
{teacher_preferences}

OUTPUT FORMAT
- Feedback text only"#,
        question = context.question,
        student_response = result.student_response,
        score = result.teacher_score,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    #[test]
    fn test_feedback_prompt_lists_status_and_limit() {
        let ctx = GradingContext::new("Why?", vec!["A", "B"], vec!["be strict"], 42);
        let result = AnalysisResult {
            student_response: "Because.".to_string(),
            teacher_score: "1/2".to_string(),
            rubric_points: BTreeMap::from([("A".to_string(), true)]),
            ..Default::default()
        };
        let mut preferences = Preferences::default();
        preferences.extra.insert("tone".to_string(), json!("warm"));

        let prompt = build_feedback_prompt(&result, &ctx, &preferences);

        assert!(prompt.contains("- A: addressed"));
        assert!(prompt.contains("- B: missing"));
        assert!(prompt.contains("~42 word feedback"));
        assert!(prompt.contains("Student Response: Because."));
        assert!(prompt.contains("- tone: warm"));
        assert!(prompt.contains("No study suggestions"));
    }
}

//! 单张图片的批改流程 - 流程层
//!
//! 流程顺序：
//! 1. 分析（识别 + 评分）→ 写 `_analysis.json`
//! 2. 生成反馈 → 写 `_feedback.txt`
//! 3. 校验反馈 → 写 `_validation.json`
//!
//! 任一步失败即停止本文件，已写出的产物保留

use std::fmt::Display;
use std::sync::Arc;

use tracing::info;

use crate::config::Config;
use crate::error::AppError;
use crate::models::analysis::AnalysisResult;
use crate::models::context::GradingContext;
use crate::models::teacher_config::TeacherConfig;
use crate::models::validation::ValidationResult;
use crate::services::{
    AnalysisStage, ArtifactWriter, ChatModel, FeedbackStage, ParseTier, ValidationStage,
};
use crate::workflow::image_ctx::ImageCtx;

/// 单个文件的处理进度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Pending,
    Analyzed,
    FeedbackGenerated,
    Validated,
    Persisted,
}

impl Display for ProcessState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ProcessState::Pending => "待处理",
            ProcessState::Analyzed => "已分析",
            ProcessState::FeedbackGenerated => "已生成反馈",
            ProcessState::Validated => "已校验",
            ProcessState::Persisted => "已保存",
        };
        f.write_str(name)
    }
}

/// 处理成功的文件
#[derive(Debug, Clone)]
pub struct GradedFile {
    pub analysis: AnalysisResult,
    pub analysis_tier: ParseTier,
    pub feedback: String,
    pub validation: ValidationResult,
    pub state: ProcessState,
}

/// 处理失败：记录失败前到达的进度
#[derive(Debug)]
pub struct FlowFailure {
    pub reached: ProcessState,
    pub error: AppError,
}

impl Display for FlowFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (在「{}」之后失败): {}",
            self.error.kind(),
            self.reached,
            self.error
        )
    }
}

/// 批改流程
///
/// - 编排单张图片的三个阶段
/// - 每个阶段完成后立即写出产物
/// - 不持有任何跨文件的可变状态
pub struct GradingFlow<M> {
    analysis: AnalysisStage<M>,
    feedback: FeedbackStage<M>,
    validation: ValidationStage<M>,
    writer: ArtifactWriter,
    teacher_config: TeacherConfig,
}

impl<M: ChatModel> GradingFlow<M> {
    /// 创建新的批改流程
    pub fn new(model: Arc<M>, config: &Config, teacher_config: TeacherConfig) -> Self {
        Self {
            analysis: AnalysisStage::new(
                model.clone(),
                &config.analysis_model,
                config.rubric_key_policy,
            ),
            feedback: FeedbackStage::new(model.clone(), &config.feedback_model),
            validation: ValidationStage::new(model, &config.validation_model),
            writer: ArtifactWriter::new(config),
            teacher_config,
        }
    }

    pub fn writer(&self) -> &ArtifactWriter {
        &self.writer
    }

    pub async fn run(
        &self,
        ctx: &ImageCtx,
        context: &GradingContext,
    ) -> Result<GradedFile, FlowFailure> {
        let mut state = ProcessState::Pending;
        let fail = |reached: ProcessState| move |error: AppError| FlowFailure { reached, error };

        // ========== 阶段 1: 分析 ==========
        info!("{} 🔍 正在识别并评分...", ctx);
        let parsed = self
            .analysis
            .analyze(ctx.path(), context)
            .await
            .map_err(fail(state))?;
        let analysis_path = self
            .writer
            .write_analysis(&ctx.stem, &parsed.value)
            .await
            .map_err(fail(state))?;
        state = ProcessState::Analyzed;
        info!(
            "{} ✓ 分析完成 (得分: {})，已保存至 {}",
            ctx,
            parsed.value.teacher_score,
            analysis_path.display()
        );

        // ========== 阶段 2: 生成反馈 ==========
        info!("{} ✍️ 正在生成反馈...", ctx);
        let feedback = self
            .feedback
            .generate_feedback(&parsed.value, context, self.teacher_config.preferences())
            .await
            .map_err(fail(state))?;
        let feedback_path = self
            .writer
            .write_feedback(&ctx.stem, &feedback)
            .await
            .map_err(fail(state))?;
        state = ProcessState::FeedbackGenerated;
        info!("{} ✓ 反馈已保存至 {}", ctx, feedback_path.display());

        // ========== 阶段 3: 校验 ==========
        info!("{} 🧪 正在校验反馈质量...", ctx);
        let validation = self
            .validation
            .validate(
                &feedback,
                &parsed.value.rubric_status(context),
                &self.teacher_config,
                context,
            )
            .await
            .map_err(fail(state))?;
        state = ProcessState::Validated;
        let validation_path = self
            .writer
            .write_validation(&ctx.stem, &validation)
            .await
            .map_err(fail(state))?;
        state = ProcessState::Persisted;
        info!(
            "{} ✓ 校验得分 {:.1}%，已保存至 {}",
            ctx,
            validation.score,
            validation_path.display()
        );

        Ok(GradedFile {
            analysis: parsed.value,
            analysis_tier: parsed.tier,
            feedback,
            validation,
            state,
        })
    }
}

//! # Academic Feedback
//!
//! 一个用于批改手写作答并生成个性化反馈的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用四层架构：
//!
//! ### ① 数据层（Models）
//! - `models/` - 批改上下文、分析结果、校验结果、教师配置
//! - `loaders` - 加载 JSON 配置文档、扫描输入图片
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单张图片
//! - `LlmService` - 通过 `ChatModel` trait 调用外部模型
//! - `AnalysisStage` / `FeedbackStage` / `ValidationStage` - 三个阶段
//! - `response_parser` - 从模型回复中容错地提取结构化数据
//! - `ArtifactWriter` - 写出各阶段产物
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一张图片"的完整处理流程
//! - `ImageCtx` - 上下文封装（文件路径 + 序号）
//! - `GradingFlow` - 流程编排（分析 → 反馈 → 校验）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 批量处理器，逐张调度并统计
//!
//! ## 模块结构

pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{AnalysisResult, GradingContext, TeacherConfig, ValidationResult};
pub use orchestrator::{App, BatchStats};
pub use services::{ChatModel, ChatRequest, LlmService};
pub use workflow::{GradingFlow, ImageCtx, ProcessState};

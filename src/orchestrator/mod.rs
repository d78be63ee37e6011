//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量处理和流程调度，是整个系统的"指挥中心"。
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<图片>)
//!     ↓
//! workflow::GradingFlow (处理单张图片)
//!     ↓
//! services (能力层：analysis / feedback / validation / artifact)
//!     ↓
//! llm_service (ChatModel，外部模型)
//! ```
//!
//! ## 设计原则
//!
//! 1. **单一职责**：batch_processor 管批量，GradingFlow 管单张
//! 2. **错误隔离**：单张图片的错误只在本层被捕获和统计
//! 3. **向下依赖**：编排层 → workflow → services
//! 4. **无业务逻辑**：只做调度和统计，不做具体业务判断

pub mod batch_processor;

// 重新导出主要类型
pub use batch_processor::{App, BatchStats};

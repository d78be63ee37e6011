pub mod grading_flow;
pub mod image_ctx;

pub use grading_flow::{FlowFailure, GradedFile, GradingFlow, ProcessState};
pub use image_ctx::ImageCtx;

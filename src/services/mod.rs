pub mod analysis_service;
pub mod artifact_writer;
pub mod feedback_service;
pub mod image_encoder;
pub mod llm_service;
pub mod response_parser;
pub mod validation_service;

pub use analysis_service::AnalysisStage;
pub use artifact_writer::ArtifactWriter;
pub use feedback_service::FeedbackStage;
pub use image_encoder::{encode_image, EncodedImage};
pub use llm_service::{ChatModel, ChatRequest, LlmService};
pub use response_parser::{ParseTier, Parsed, RubricKeyPolicy};
pub use validation_service::ValidationStage;

pub mod analysis;
pub mod context;
pub mod loaders;
pub mod teacher_config;
pub mod validation;

pub use analysis::AnalysisResult;
pub use context::{GradingContext, RubricPoint};
pub use loaders::{list_input_images, load_json_document};
pub use teacher_config::{FeedbackInsights, Preferences, TeacherConfig};
pub use validation::{ValidationCriterion, ValidationResult};

pub mod logging;
pub mod prompt;
pub mod report;

pub use logging::truncate_text;
pub use prompt::collect_grading_context;
pub use report::render_summary;

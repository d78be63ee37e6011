pub mod image_loader;
pub mod json_loader;

pub use image_loader::list_input_images;
pub use json_loader::load_json_document;

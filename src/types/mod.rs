// Public modules
pub mod content;
pub mod error_response;
pub mod generate_content_request;
pub mod generate_content_response;
pub mod model;

// Re-exports
pub use content::{Content, Part};
pub use error_response::{ErrorResponse, ErrorStatus};
pub use generate_content_request::GenerateContentRequest;
pub use generate_content_response::{Candidate, GenerateContentResponse};
pub use model::{KnownModel, Model};

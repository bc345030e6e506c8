pub mod engine;
pub mod merge;
pub mod sections;

pub use engine::FieldError;
pub use merge::deep_merge;
pub use sections::{SectionKind, validate_section};

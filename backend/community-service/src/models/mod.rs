/// Data models for community-service
///
/// - Content: tips, warnings and photos attached to a city
/// - Actor: the identity and role performing an operation
pub mod actor;
pub mod content;

pub use actor::{Actor, Role};
pub use content::{ContentBody, ContentId, ContentItem, ContentKind};

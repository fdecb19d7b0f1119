//! Database schemas for quillstack
//!
//! Defines MongoDB document structures for users, posts, and comments.

mod comment;
mod metadata;
mod post;
mod user;

pub use comment::{CommentDoc, COMMENT_COLLECTION};
pub use metadata::Metadata;
pub use post::{PostDoc, PostQuery, PostSort, PostStatus, POST_COLLECTION};
pub use user::{SocialLinks, UserDoc, UserPreferences, UserRole, UserStats, USER_COLLECTION};

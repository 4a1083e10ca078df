//! `SeaORM` entity definitions.

pub mod attachments;
pub mod comments;
pub mod feedbacks;

//! Initial database migration.
//!
//! Creates the feedback, attachment, and comment tables with their indexes.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        db.execute_unprepared(FEEDBACKS_SQL).await?;
        db.execute_unprepared(ATTACHMENTS_SQL).await?;
        db.execute_unprepared(COMMENTS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const FEEDBACKS_SQL: &str = r"
CREATE TABLE feedbacks (
    id UUID PRIMARY KEY,
    reviewer_id BIGINT NOT NULL,
    student_id BIGINT NOT NULL,
    submission_id BIGINT NOT NULL,
    title VARCHAR(255) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX idx_feedbacks_reviewer ON feedbacks (reviewer_id);
CREATE INDEX idx_feedbacks_student_submission ON feedbacks (student_id, submission_id);
";

const ATTACHMENTS_SQL: &str = r"
CREATE TABLE attachments (
    id UUID PRIMARY KEY,
    feedback_id UUID NOT NULL REFERENCES feedbacks (id) ON DELETE CASCADE,
    file_name VARCHAR(255) NOT NULL,
    content_type VARCHAR(127) NOT NULL,
    file_size BIGINT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT uq_attachments_feedback_file UNIQUE (feedback_id, file_name)
);

CREATE INDEX idx_attachments_feedback ON attachments (feedback_id);
";

const COMMENTS_SQL: &str = r"
CREATE TABLE comments (
    id UUID PRIMARY KEY,
    feedback_id UUID NOT NULL REFERENCES feedbacks (id) ON DELETE CASCADE,
    author_id BIGINT NOT NULL,
    parent_id UUID REFERENCES comments (id),
    content TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX idx_comments_feedback ON comments (feedback_id);
CREATE INDEX idx_comments_parent ON comments (parent_id);
";

const DROP_ALL_SQL: &str = r"
DROP TABLE IF EXISTS comments;
DROP TABLE IF EXISTS attachments;
DROP TABLE IF EXISTS feedbacks;
";

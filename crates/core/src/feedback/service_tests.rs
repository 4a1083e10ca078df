use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::Utc;

use super::*;
use crate::blobstore::{BlobProvider, asset_key};

/// In-memory feedback store for testing.
struct MockFeedbackRepository {
    rows: Mutex<HashMap<Uuid, Feedback>>,
}

impl MockFeedbackRepository {
    fn new() -> Self {
        Self {
            rows: Mutex::new(HashMap::new()),
        }
    }

    fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

impl FeedbackRepository for MockFeedbackRepository {
    async fn create(&self, record: CreateFeedbackRecord) -> Result<Feedback, FeedbackError> {
        let now = Utc::now();
        let feedback = Feedback {
            id: record.id,
            reviewer_id: record.reviewer_id,
            student_id: record.student_id,
            submission_id: record.submission_id,
            title: record.title,
            created_at: now,
            updated_at: now,
        };
        self.rows
            .lock()
            .unwrap()
            .insert(feedback.id, feedback.clone());
        Ok(feedback)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Feedback>, FeedbackError> {
        Ok(self.rows.lock().unwrap().get(&id).cloned())
    }

    async fn update_title(
        &self,
        id: Uuid,
        title: String,
    ) -> Result<Option<Feedback>, FeedbackError> {
        let mut rows = self.rows.lock().unwrap();
        Ok(rows.get_mut(&id).map(|feedback| {
            feedback.title = title;
            feedback.updated_at = Utc::now();
            feedback.clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, FeedbackError> {
        Ok(self.rows.lock().unwrap().remove(&id).is_some())
    }

    async fn list(
        &self,
        filter: &FeedbackFilter,
        page: &PageRequest,
    ) -> Result<(Vec<Feedback>, u64), FeedbackError> {
        let rows = self.rows.lock().unwrap();
        let mut matches: Vec<Feedback> = rows
            .values()
            .filter(|f| filter.reviewer_id.is_none_or(|id| f.reviewer_id == id))
            .filter(|f| filter.student_id.is_none_or(|id| f.student_id == id))
            .filter(|f| filter.submission_id.is_none_or(|id| f.submission_id == id))
            .cloned()
            .collect();
        matches.sort_by_key(|f| std::cmp::Reverse(f.created_at));
        let total = matches.len() as u64;
        let matches = matches
            .into_iter()
            .skip(usize::try_from(page.offset()).unwrap())
            .take(usize::try_from(page.limit()).unwrap())
            .collect();
        Ok((matches, total))
    }
}

fn temp_store() -> (BlobStore, PathBuf) {
    let root = std::env::temp_dir().join(format!("critique-feedback-{}", Uuid::new_v4()));
    std::fs::create_dir_all(&root).expect("create temp root");
    let store =
        BlobStore::from_provider(&BlobProvider::local_fs(&root)).expect("create local store");
    (store, root)
}

fn service(store: &BlobStore) -> (FeedbackService<MockFeedbackRepository>, Arc<MockFeedbackRepository>) {
    let repo = Arc::new(MockFeedbackRepository::new());
    (
        FeedbackService::new(store.clone(), Arc::clone(&repo)),
        repo,
    )
}

fn create_input(reviewer_id: i64) -> CreateFeedbackInput {
    CreateFeedbackInput {
        reviewer_id,
        student_id: 7,
        submission_id: 11,
        title: "Solid solution".to_string(),
        content: "# Review\n\nWell structured.".to_string(),
    }
}

#[tokio::test]
async fn test_create_writes_row_and_content() {
    let (store, _root) = temp_store();
    let (service, repo) = service(&store);

    let feedback = service.create(create_input(3)).await.unwrap();

    assert_eq!(repo.len(), 1);
    let content = service.get_content(feedback.id).await.unwrap();
    assert_eq!(content, "# Review\n\nWell structured.".as_bytes());
}

#[tokio::test]
async fn test_create_validates_input() {
    let (store, _root) = temp_store();
    let (service, _repo) = service(&store);

    let mut input = create_input(3);
    input.reviewer_id = 0;
    assert!(matches!(
        service.create(input).await,
        Err(FeedbackError::Validation(_))
    ));

    let mut input = create_input(3);
    input.title = "  ".to_string();
    assert!(matches!(
        service.create(input).await,
        Err(FeedbackError::Validation(_))
    ));
}

#[tokio::test]
async fn test_failed_content_write_compensates_row() {
    let (store, _root) = temp_store();
    let (service, repo) = service(&store);

    // Force every content write to fail by squatting a directory on every
    // possible content path: a put into "feedback/<id>/content.md" fails if
    // that path is already a directory. We cannot know the id up front, so
    // instead make the whole feedback/ prefix a file.
    store
        .put("feedback", bytes::Bytes::from_static(b"squatter"), "text/plain")
        .await
        .unwrap();

    let err = service.create(create_input(3)).await.unwrap_err();
    assert!(matches!(err, FeedbackError::Storage(_)));

    // Compensating delete removed the row again.
    assert_eq!(repo.len(), 0);
}

#[tokio::test]
async fn test_update_checks_author() {
    let (store, _root) = temp_store();
    let (service, _repo) = service(&store);
    let feedback = service.create(create_input(3)).await.unwrap();

    let err = service
        .update(
            feedback.id,
            99,
            UpdateFeedbackInput {
                title: Some("hijacked".to_string()),
                content: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, FeedbackError::AccessDenied(_)));

    let updated = service
        .update(
            feedback.id,
            3,
            UpdateFeedbackInput {
                title: Some("Revised title".to_string()),
                content: Some("updated body".to_string()),
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.title, "Revised title");
    assert_eq!(
        service.get_content(feedback.id).await.unwrap(),
        "updated body".as_bytes()
    );
}

#[tokio::test]
async fn test_delete_removes_row_and_blob_prefix() {
    let (store, _root) = temp_store();
    let (service, repo) = service(&store);
    let feedback = service.create(create_input(3)).await.unwrap();

    // An attachment object under the same prefix must disappear with it.
    let key = asset_key(feedback.id, "notes.txt");
    store
        .put(&key, bytes::Bytes::from_static(b"attached"), "text/plain")
        .await
        .unwrap();

    let err = service.delete(feedback.id, 99).await.unwrap_err();
    assert!(matches!(err, FeedbackError::AccessDenied(_)));

    service.delete(feedback.id, 3).await.unwrap();
    assert_eq!(repo.len(), 0);
    assert!(!store.exists(&key).await);
    assert!(
        !store
            .exists(&crate::blobstore::content_key(feedback.id))
            .await
    );

    let err = service.delete(feedback.id, 3).await.unwrap_err();
    assert!(matches!(err, FeedbackError::NotFound(_)));
}

#[tokio::test]
async fn test_list_filters() {
    let (store, _root) = temp_store();
    let (service, _repo) = service(&store);

    service.create(create_input(3)).await.unwrap();
    service.create(create_input(3)).await.unwrap();
    service.create(create_input(4)).await.unwrap();

    let (mine, total) = service
        .list(
            &FeedbackFilter {
                reviewer_id: Some(3),
                ..FeedbackFilter::default()
            },
            &PageRequest::default(),
        )
        .await
        .unwrap();
    assert_eq!(total, 2);
    assert_eq!(mine.len(), 2);

    let (all, total) = service
        .list(&FeedbackFilter::default(), &PageRequest::default())
        .await
        .unwrap();
    assert_eq!(total, 3);
    assert_eq!(all.len(), 3);
}

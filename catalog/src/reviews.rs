//! Review and comment storage.
//!
//! Review creation runs the integrity guard: the target title must exist,
//! the author must not already have a review for it, and the score must be
//! in bounds — all checked before anything is written. Author and title
//! are taken from request context, never from the payload, which is what
//! makes the object-level authorship rule meaningful on later updates.

use database::Database;
use tracing::{debug, info};

use crate::error::{CatalogError, Result};
use crate::models::{validate_score, Comment, Review};

const REVIEW_SELECT: &str = r#"
    SELECT r.id, r.title_id, r.author_id, u.username AS author,
           r.text, r.score, r.pub_date
    FROM reviews r
    JOIN users u ON u.id = r.author_id
"#;

const COMMENT_SELECT: &str = r#"
    SELECT c.id, c.review_id, c.author_id, u.username AS author,
           c.text, c.pub_date
    FROM comments c
    LEFT JOIN users u ON u.id = c.author_id
"#;

pub struct ReviewStore<'a> {
    db: &'a Database,
}

impl<'a> ReviewStore<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Create a review for the title on behalf of the author resolved from
    /// the request context.
    pub async fn create(
        &self,
        title_id: i64,
        author_id: &str,
        text: &str,
        score: i64,
    ) -> Result<Review> {
        self.require_title(title_id).await?;

        let existing: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM reviews WHERE title_id = ? AND author_id = ?",
        )
        .bind(title_id)
        .bind(author_id)
        .fetch_one(self.db.pool())
        .await?;
        if existing > 0 {
            debug!("Duplicate review attempt on title {} by {}", title_id, author_id);
            return Err(CatalogError::Validation(
                "You already have a review for this work.".to_string(),
            ));
        }

        validate_score(score)?;

        let result = sqlx::query(
            "INSERT INTO reviews (title_id, author_id, text, score) VALUES (?, ?, ?, ?)",
        )
        .bind(title_id)
        .bind(author_id)
        .bind(text)
        .bind(score)
        .execute(self.db.pool())
        .await
        // The unique index backs the check above against concurrent creates.
        .map_err(|e| {
            CatalogError::from_write_conflict(e, "You already have a review for this work.")
        })?;

        info!("Created review {} on title {}", result.last_insert_rowid(), title_id);

        self.get(title_id, result.last_insert_rowid()).await
    }

    pub async fn get(&self, title_id: i64, review_id: i64) -> Result<Review> {
        let sql = format!("{REVIEW_SELECT} WHERE r.id = ? AND r.title_id = ?");
        sqlx::query_as::<_, Review>(&sql)
            .bind(review_id)
            .bind(title_id)
            .fetch_optional(self.db.pool())
            .await?
            .ok_or_else(|| CatalogError::NotFound(format!("review {}", review_id)))
    }

    /// Reviews for a title, newest first.
    pub async fn list(&self, title_id: i64, limit: i64, offset: i64) -> Result<Vec<Review>> {
        self.require_title(title_id).await?;

        let sql = format!(
            "{REVIEW_SELECT} WHERE r.title_id = ? ORDER BY r.pub_date DESC, r.id DESC \
             LIMIT ? OFFSET ?"
        );
        let reviews = sqlx::query_as::<_, Review>(&sql)
            .bind(title_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(self.db.pool())
            .await?;
        Ok(reviews)
    }

    /// Partial update. Author and title are immutable; the uniqueness check
    /// does not re-run, so an author editing their own review is never
    /// blocked by it.
    pub async fn update(
        &self,
        title_id: i64,
        review_id: i64,
        text: Option<&str>,
        score: Option<i64>,
    ) -> Result<Review> {
        let review = self.get(title_id, review_id).await?;

        if let Some(score) = score {
            validate_score(score)?;
            sqlx::query("UPDATE reviews SET score = ? WHERE id = ?")
                .bind(score)
                .bind(review.id)
                .execute(self.db.pool())
                .await?;
        }
        if let Some(text) = text {
            sqlx::query("UPDATE reviews SET text = ? WHERE id = ?")
                .bind(text)
                .bind(review.id)
                .execute(self.db.pool())
                .await?;
        }

        self.get(title_id, review_id).await
    }

    pub async fn delete(&self, title_id: i64, review_id: i64) -> Result<()> {
        let review = self.get(title_id, review_id).await?;
        sqlx::query("DELETE FROM reviews WHERE id = ?")
            .bind(review.id)
            .execute(self.db.pool())
            .await?;
        info!("Deleted review {}", review_id);
        Ok(())
    }

    async fn require_title(&self, title_id: i64) -> Result<()> {
        let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM titles WHERE id = ?")
            .bind(title_id)
            .fetch_one(self.db.pool())
            .await?;
        if exists == 0 {
            return Err(CatalogError::NotFound(format!("title {}", title_id)));
        }
        Ok(())
    }
}

pub struct CommentStore<'a> {
    db: &'a Database,
}

impl<'a> CommentStore<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub async fn create(
        &self,
        title_id: i64,
        review_id: i64,
        author_id: &str,
        text: &str,
    ) -> Result<Comment> {
        self.require_review(title_id, review_id).await?;

        let result =
            sqlx::query("INSERT INTO comments (review_id, author_id, text) VALUES (?, ?, ?)")
                .bind(review_id)
                .bind(author_id)
                .bind(text)
                .execute(self.db.pool())
                .await?;

        info!(
            "Created comment {} on review {}",
            result.last_insert_rowid(),
            review_id
        );

        self.get(title_id, review_id, result.last_insert_rowid())
            .await
    }

    pub async fn get(&self, title_id: i64, review_id: i64, comment_id: i64) -> Result<Comment> {
        self.require_review(title_id, review_id).await?;

        let sql = format!("{COMMENT_SELECT} WHERE c.id = ? AND c.review_id = ?");
        sqlx::query_as::<_, Comment>(&sql)
            .bind(comment_id)
            .bind(review_id)
            .fetch_optional(self.db.pool())
            .await?
            .ok_or_else(|| CatalogError::NotFound(format!("comment {}", comment_id)))
    }

    /// Comments on a review, oldest first.
    pub async fn list(
        &self,
        title_id: i64,
        review_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Comment>> {
        self.require_review(title_id, review_id).await?;

        let sql = format!(
            "{COMMENT_SELECT} WHERE c.review_id = ? ORDER BY c.pub_date ASC, c.id ASC \
             LIMIT ? OFFSET ?"
        );
        let comments = sqlx::query_as::<_, Comment>(&sql)
            .bind(review_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(self.db.pool())
            .await?;
        Ok(comments)
    }

    pub async fn update(
        &self,
        title_id: i64,
        review_id: i64,
        comment_id: i64,
        text: &str,
    ) -> Result<Comment> {
        let comment = self.get(title_id, review_id, comment_id).await?;
        sqlx::query("UPDATE comments SET text = ? WHERE id = ?")
            .bind(text)
            .bind(comment.id)
            .execute(self.db.pool())
            .await?;
        self.get(title_id, review_id, comment_id).await
    }

    pub async fn delete(&self, title_id: i64, review_id: i64, comment_id: i64) -> Result<()> {
        let comment = self.get(title_id, review_id, comment_id).await?;
        sqlx::query("DELETE FROM comments WHERE id = ?")
            .bind(comment.id)
            .execute(self.db.pool())
            .await?;
        info!("Deleted comment {}", comment_id);
        Ok(())
    }

    /// The review must exist and belong to the title from the path.
    async fn require_review(&self, title_id: i64, review_id: i64) -> Result<()> {
        let exists: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM reviews WHERE id = ? AND title_id = ?")
                .bind(review_id)
                .bind(title_id)
                .fetch_one(self.db.pool())
                .await?;
        if exists == 0 {
            return Err(CatalogError::NotFound(format!("review {}", review_id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TitleFilter;
    use crate::titles::TitleStore;

    async fn test_db() -> Database {
        Database::new_in_memory().await.unwrap()
    }

    async fn seed_user(db: &Database, id: &str, username: &str) {
        sqlx::query("INSERT INTO users (id, username, email) VALUES (?, ?, ?)")
            .bind(id)
            .bind(username)
            .bind(format!("{username}@example.com"))
            .execute(db.pool())
            .await
            .unwrap();
    }

    async fn seed_title(db: &Database, name: &str) -> i64 {
        let result = sqlx::query("INSERT INTO titles (name, year) VALUES (?, 2000)")
            .bind(name)
            .execute(db.pool())
            .await
            .unwrap();
        result.last_insert_rowid()
    }

    #[tokio::test]
    async fn test_second_review_by_same_author_is_rejected() {
        let db = test_db().await;
        seed_user(&db, "u1", "reader").await;
        let title_id = seed_title(&db, "War and Peace").await;
        let store = ReviewStore::new(&db);

        store.create(title_id, "u1", "Great.", 8).await.unwrap();
        let err = store
            .create(title_id, "u1", "Changed my mind.", 3)
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Validation(_)));
        assert_eq!(err.to_string(), "You already have a review for this work.");
    }

    #[tokio::test]
    async fn test_same_author_different_titles_is_fine() {
        let db = test_db().await;
        seed_user(&db, "u1", "reader").await;
        let first = seed_title(&db, "One").await;
        let second = seed_title(&db, "Two").await;
        let store = ReviewStore::new(&db);

        store.create(first, "u1", "Great.", 8).await.unwrap();
        store.create(second, "u1", "Also great.", 9).await.unwrap();
    }

    #[tokio::test]
    async fn test_review_on_missing_title() {
        let db = test_db().await;
        seed_user(&db, "u1", "reader").await;
        let store = ReviewStore::new(&db);

        let err = store.create(404, "u1", "Great.", 8).await.unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_score_bounds_cited_in_error() {
        let db = test_db().await;
        seed_user(&db, "u1", "reader").await;
        let title_id = seed_title(&db, "War and Peace").await;
        let store = ReviewStore::new(&db);

        let err = store.create(title_id, "u1", "Bad.", 0).await.unwrap_err();
        assert_eq!(err.to_string(), "The minimum score must be 1");

        let err = store.create(title_id, "u1", "Great.", 11).await.unwrap_err();
        assert_eq!(err.to_string(), "The maximum score must be 10");

        // Nothing was persisted by the failed attempts.
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reviews")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_update_skips_uniqueness_but_keeps_bounds() {
        let db = test_db().await;
        seed_user(&db, "u1", "reader").await;
        let title_id = seed_title(&db, "War and Peace").await;
        let store = ReviewStore::new(&db);

        let review = store.create(title_id, "u1", "Great.", 8).await.unwrap();

        // Editing an existing review must not trip the duplicate check.
        let updated = store
            .update(title_id, review.id, Some("Even better."), Some(10))
            .await
            .unwrap();
        assert_eq!(updated.score, 10);
        assert_eq!(updated.text, "Even better.");
        assert_eq!(updated.author_id, "u1");

        let err = store
            .update(title_id, review.id, None, Some(11))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "The maximum score must be 10");
    }

    #[tokio::test]
    async fn test_rating_is_mean_and_absent_without_reviews() {
        let db = test_db().await;
        seed_user(&db, "u1", "first").await;
        seed_user(&db, "u2", "second").await;
        let title_id = seed_title(&db, "War and Peace").await;

        let titles = TitleStore::new(&db);
        assert_eq!(titles.get(title_id).await.unwrap().rating, None);

        let reviews = ReviewStore::new(&db);
        reviews.create(title_id, "u1", "Great.", 8).await.unwrap();
        reviews.create(title_id, "u2", "Superb.", 10).await.unwrap();

        let fetched = titles.get(title_id).await.unwrap();
        assert_eq!(fetched.rating, Some(9.0));

        let listed = titles.list(&TitleFilter::default(), 50, 0).await.unwrap();
        assert_eq!(listed[0].rating, Some(9.0));
    }

    #[tokio::test]
    async fn test_title_delete_cascades_to_reviews_and_comments() {
        let db = test_db().await;
        seed_user(&db, "u1", "reader").await;
        let title_id = seed_title(&db, "War and Peace").await;

        let reviews = ReviewStore::new(&db);
        let review = reviews.create(title_id, "u1", "Great.", 8).await.unwrap();
        let comments = CommentStore::new(&db);
        comments
            .create(title_id, review.id, "u1", "Agreed.")
            .await
            .unwrap();

        TitleStore::new(&db).delete(title_id).await.unwrap();

        let review_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reviews")
            .fetch_one(db.pool())
            .await
            .unwrap();
        let comment_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(review_count, 0);
        assert_eq!(comment_count, 0);
    }

    #[tokio::test]
    async fn test_comment_author_survives_account_deletion() {
        let db = test_db().await;
        seed_user(&db, "u1", "reader").await;
        seed_user(&db, "u2", "commenter").await;
        let title_id = seed_title(&db, "War and Peace").await;

        let review = ReviewStore::new(&db)
            .create(title_id, "u1", "Great.", 8)
            .await
            .unwrap();
        let comments = CommentStore::new(&db);
        let comment = comments
            .create(title_id, review.id, "u2", "Agreed.")
            .await
            .unwrap();
        assert_eq!(comment.author.as_deref(), Some("commenter"));

        sqlx::query("DELETE FROM users WHERE id = 'u2'")
            .execute(db.pool())
            .await
            .unwrap();

        let fetched = comments.get(title_id, review.id, comment.id).await.unwrap();
        assert_eq!(fetched.author, None);
        assert_eq!(fetched.text, "Agreed.");
    }

    #[tokio::test]
    async fn test_comment_requires_matching_title_and_review() {
        let db = test_db().await;
        seed_user(&db, "u1", "reader").await;
        let first = seed_title(&db, "One").await;
        let second = seed_title(&db, "Two").await;

        let review = ReviewStore::new(&db)
            .create(first, "u1", "Great.", 8)
            .await
            .unwrap();

        // The review belongs to `first`; addressing it through `second` 404s.
        let err = CommentStore::new(&db)
            .create(second, review.id, "u1", "Lost.")
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_comments_listed_oldest_first() {
        let db = test_db().await;
        seed_user(&db, "u1", "reader").await;
        let title_id = seed_title(&db, "War and Peace").await;

        let review = ReviewStore::new(&db)
            .create(title_id, "u1", "Great.", 8)
            .await
            .unwrap();
        let comments = CommentStore::new(&db);
        comments
            .create(title_id, review.id, "u1", "First.")
            .await
            .unwrap();
        comments
            .create(title_id, review.id, "u1", "Second.")
            .await
            .unwrap();

        let listed = comments.list(title_id, review.id, 50, 0).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].text, "First.");
        assert_eq!(listed[1].text, "Second.");
    }
}

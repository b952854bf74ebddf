//! Category and genre storage. Both are slug-keyed tagging entities with
//! the same surface (list/create/destroy), so one store serves both tables.

use database::Database;
use serde::Deserialize;
use tracing::info;

use crate::error::{CatalogError, Result};
use crate::models::Tag;

/// Write payload for categories and genres.
#[derive(Debug, Clone, Deserialize)]
pub struct NewTag {
    pub name: String,
    pub slug: String,
}

/// Storage operations for one tag table.
pub struct TagStore<'a> {
    db: &'a Database,
    table: &'static str,
    label: &'static str,
}

impl<'a> TagStore<'a> {
    pub fn categories(db: &'a Database) -> Self {
        Self {
            db,
            table: "categories",
            label: "category",
        }
    }

    pub fn genres(db: &'a Database) -> Self {
        Self {
            db,
            table: "genres",
            label: "genre",
        }
    }

    pub async fn create(&self, new_tag: NewTag) -> Result<Tag> {
        if new_tag.slug.trim().is_empty() || new_tag.name.trim().is_empty() {
            return Err(CatalogError::Validation(
                "Name and slug must not be empty.".to_string(),
            ));
        }

        let sql = format!("INSERT INTO {} (name, slug) VALUES (?, ?)", self.table);
        sqlx::query(&sql)
            .bind(&new_tag.name)
            .bind(&new_tag.slug)
            .execute(self.db.pool())
            .await
            .map_err(|e| {
                CatalogError::from_write_conflict(
                    e,
                    &format!("A {} with this name or slug already exists.", self.label),
                )
            })?;

        info!("Created {} {}", self.label, new_tag.slug);

        self.get_by_slug(&new_tag.slug).await
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<Tag> {
        let sql = format!("SELECT * FROM {} WHERE slug = ?", self.table);
        sqlx::query_as::<_, Tag>(&sql)
            .bind(slug)
            .fetch_optional(self.db.pool())
            .await?
            .ok_or_else(|| CatalogError::NotFound(format!("{} {}", self.label, slug)))
    }

    /// Newest first, optionally filtered by exact name.
    pub async fn list(&self, search: Option<&str>, limit: i64, offset: i64) -> Result<Vec<Tag>> {
        let tags = match search {
            Some(name) => {
                let sql = format!(
                    "SELECT * FROM {} WHERE name = ? ORDER BY id DESC LIMIT ? OFFSET ?",
                    self.table
                );
                sqlx::query_as::<_, Tag>(&sql)
                    .bind(name)
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(self.db.pool())
                    .await?
            }
            None => {
                let sql = format!(
                    "SELECT * FROM {} ORDER BY id DESC LIMIT ? OFFSET ?",
                    self.table
                );
                sqlx::query_as::<_, Tag>(&sql)
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(self.db.pool())
                    .await?
            }
        };
        Ok(tags)
    }

    pub async fn delete_by_slug(&self, slug: &str) -> Result<()> {
        let sql = format!("DELETE FROM {} WHERE slug = ?", self.table);
        let result = sqlx::query(&sql)
            .bind(slug)
            .execute(self.db.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(CatalogError::NotFound(format!("{} {}", self.label, slug)));
        }

        info!("Deleted {} {}", self.label, slug);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> Database {
        Database::new_in_memory().await.unwrap()
    }

    fn tag(name: &str, slug: &str) -> NewTag {
        NewTag {
            name: name.to_string(),
            slug: slug.to_string(),
        }
    }

    #[tokio::test]
    async fn test_category_create_and_lookup() {
        let db = test_db().await;
        let store = TagStore::categories(&db);

        let created = store.create(tag("Books", "books")).await.unwrap();
        assert_eq!(created.name, "Books");

        let fetched = store.get_by_slug("books").await.unwrap();
        assert_eq!(fetched.id, created.id);
    }

    #[tokio::test]
    async fn test_category_and_genre_tables_are_separate() {
        let db = test_db().await;
        TagStore::categories(&db)
            .create(tag("Books", "books"))
            .await
            .unwrap();

        let err = TagStore::genres(&db).get_by_slug("books").await.unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_duplicate_slug_is_validation_error() {
        let db = test_db().await;
        let store = TagStore::genres(&db);

        store.create(tag("Drama", "drama")).await.unwrap();
        let err = store.create(tag("Other Drama", "drama")).await.unwrap_err();
        assert!(matches!(err, CatalogError::Validation(_)));
    }

    #[tokio::test]
    async fn test_list_newest_first_and_name_search() {
        let db = test_db().await;
        let store = TagStore::categories(&db);

        store.create(tag("Books", "books")).await.unwrap();
        store.create(tag("Films", "films")).await.unwrap();

        let all = store.list(None, 50, 0).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].slug, "films");

        let hits = store.list(Some("Books"), 50, 0).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].slug, "books");
    }

    #[tokio::test]
    async fn test_delete_missing_tag() {
        let db = test_db().await;
        let store = TagStore::categories(&db);
        let err = store.delete_by_slug("ghost").await.unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_empty_slug_is_rejected() {
        let db = test_db().await;
        let store = TagStore::categories(&db);
        let err = store.create(tag("Books", "  ")).await.unwrap_err();
        assert!(matches!(err, CatalogError::Validation(_)));
    }
}

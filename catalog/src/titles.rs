//! Title storage and the read-time rating aggregation.
//!
//! The rating is never stored: every read computes AVG(score) over the
//! title's reviews, so it is always consistent with current review data.
//! A title with no reviews has no rating at all rather than a zero.

use database::Database;
use tracing::info;

use crate::error::{CatalogError, Result};
use crate::models::{validate_year, NewTitle, Tag, Title, TitleFilter, TitlePatch, TitleRow};

const DETAIL_SQL: &str = r#"
    SELECT t.id, t.name, t.year, t.description, t.category_id,
           AVG(r.score) AS rating
    FROM titles t
    LEFT JOIN reviews r ON r.title_id = t.id
    WHERE t.id = ?
    GROUP BY t.id
"#;

pub struct TitleStore<'a> {
    db: &'a Database,
}

impl<'a> TitleStore<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub async fn create(&self, new_title: NewTitle) -> Result<Title> {
        validate_year(new_title.year)?;

        let category_id = self.resolve_category(new_title.category.as_deref()).await?;
        let genre_ids = self.resolve_genres(&new_title.genre).await?;

        let result = sqlx::query(
            "INSERT INTO titles (name, year, description, category_id) VALUES (?, ?, ?, ?)",
        )
        .bind(&new_title.name)
        .bind(new_title.year)
        .bind(&new_title.description)
        .bind(category_id)
        .execute(self.db.pool())
        .await?;

        let id = result.last_insert_rowid();
        self.set_genres(id, &genre_ids).await?;

        info!("Created title {} ({})", new_title.name, id);

        self.get(id).await
    }

    pub async fn get(&self, id: i64) -> Result<Title> {
        let row = sqlx::query_as::<_, TitleRow>(DETAIL_SQL)
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?
            .ok_or_else(|| CatalogError::NotFound(format!("title {}", id)))?;

        self.attach(row).await
    }

    /// Titles ordered by descending year, with the list filters applied.
    pub async fn list(&self, filter: &TitleFilter, limit: i64, offset: i64) -> Result<Vec<Title>> {
        let mut sql = String::from(
            r#"
            SELECT t.id, t.name, t.year, t.description, t.category_id,
                   AVG(r.score) AS rating
            FROM titles t
            LEFT JOIN reviews r ON r.title_id = t.id
            "#,
        );

        let mut clauses: Vec<&str> = Vec::new();
        let mut binds: Vec<serde_json::Value> = Vec::new();

        if let Some(name) = &filter.name {
            clauses.push("t.name LIKE '%' || ? || '%'");
            binds.push(serde_json::Value::from(name.clone()));
        }
        if let Some(category) = &filter.category {
            clauses.push("t.category_id IN (SELECT id FROM categories WHERE slug = ?)");
            binds.push(serde_json::Value::from(category.clone()));
        }
        if let Some(genre) = &filter.genre {
            clauses.push(
                "t.id IN (SELECT tg.title_id FROM title_genres tg \
                 JOIN genres g ON g.id = tg.genre_id WHERE g.slug = ?)",
            );
            binds.push(serde_json::Value::from(genre.clone()));
        }
        if let Some(year) = filter.year {
            clauses.push("t.year = ?");
            binds.push(serde_json::Value::from(year));
        }

        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" GROUP BY t.id ORDER BY t.year DESC, t.id DESC LIMIT ? OFFSET ?");

        let mut query = sqlx::query_as::<_, TitleRow>(&sql);
        for bind in binds {
            query = match bind {
                serde_json::Value::Number(n) => query.bind(n.as_i64()),
                serde_json::Value::String(s) => query.bind(s),
                other => query.bind(other.to_string()),
            };
        }
        query = query.bind(limit).bind(offset);

        let rows = query.fetch_all(self.db.pool()).await?;

        let mut titles = Vec::with_capacity(rows.len());
        for row in rows {
            titles.push(self.attach(row).await?);
        }
        Ok(titles)
    }

    pub async fn update(&self, id: i64, patch: TitlePatch) -> Result<Title> {
        // Ensure the title exists before any slug resolution.
        self.get(id).await?;

        if let Some(year) = patch.year {
            validate_year(year)?;
        }

        let mut set_clauses: Vec<&str> = Vec::new();
        let mut binds: Vec<serde_json::Value> = Vec::new();

        if let Some(name) = &patch.name {
            set_clauses.push("name = ?");
            binds.push(serde_json::Value::from(name.clone()));
        }
        if let Some(year) = patch.year {
            set_clauses.push("year = ?");
            binds.push(serde_json::Value::from(year));
        }
        if let Some(description) = &patch.description {
            set_clauses.push("description = ?");
            binds.push(serde_json::Value::from(description.clone()));
        }
        if let Some(slug) = &patch.category {
            let category_id = self.resolve_category(Some(slug)).await?;
            set_clauses.push("category_id = ?");
            binds.push(serde_json::Value::from(category_id));
        }

        if !set_clauses.is_empty() {
            let sql = format!("UPDATE titles SET {} WHERE id = ?", set_clauses.join(", "));
            let mut query = sqlx::query(&sql);
            for bind in binds {
                query = match bind {
                    serde_json::Value::Number(n) => query.bind(n.as_i64()),
                    serde_json::Value::String(s) => query.bind(s),
                    other => query.bind(other.to_string()),
                };
            }
            query.bind(id).execute(self.db.pool()).await?;
        }

        if let Some(genres) = &patch.genre {
            let genre_ids = self.resolve_genres(genres).await?;
            sqlx::query("DELETE FROM title_genres WHERE title_id = ?")
                .bind(id)
                .execute(self.db.pool())
                .await?;
            self.set_genres(id, &genre_ids).await?;
        }

        self.get(id).await
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM titles WHERE id = ?")
            .bind(id)
            .execute(self.db.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(CatalogError::NotFound(format!("title {}", id)));
        }

        info!("Deleted title {}", id);
        Ok(())
    }

    async fn attach(&self, row: TitleRow) -> Result<Title> {
        let category = match row.category_id {
            Some(category_id) => {
                sqlx::query_as::<_, Tag>("SELECT * FROM categories WHERE id = ?")
                    .bind(category_id)
                    .fetch_optional(self.db.pool())
                    .await?
            }
            None => None,
        };

        let genre = sqlx::query_as::<_, Tag>(
            r#"
            SELECT g.id, g.name, g.slug
            FROM genres g
            JOIN title_genres tg ON tg.genre_id = g.id
            WHERE tg.title_id = ?
            ORDER BY g.slug
            "#,
        )
        .bind(row.id)
        .fetch_all(self.db.pool())
        .await?;

        Ok(Title {
            id: row.id,
            name: row.name,
            year: row.year,
            description: row.description,
            category,
            genre,
            rating: row.rating,
        })
    }

    async fn resolve_category(&self, slug: Option<&str>) -> Result<Option<i64>> {
        let Some(slug) = slug else {
            return Ok(None);
        };
        let id: Option<i64> = sqlx::query_scalar("SELECT id FROM categories WHERE slug = ?")
            .bind(slug)
            .fetch_optional(self.db.pool())
            .await?;
        id.map(Some).ok_or_else(|| {
            CatalogError::Validation(format!("Category with slug '{slug}' does not exist."))
        })
    }

    async fn resolve_genres(&self, slugs: &[String]) -> Result<Vec<i64>> {
        let mut ids = Vec::with_capacity(slugs.len());
        for slug in slugs {
            let id: Option<i64> = sqlx::query_scalar("SELECT id FROM genres WHERE slug = ?")
                .bind(slug)
                .fetch_optional(self.db.pool())
                .await?;
            let id = id.ok_or_else(|| {
                CatalogError::Validation(format!("Genre with slug '{slug}' does not exist."))
            })?;
            ids.push(id);
        }
        Ok(ids)
    }

    async fn set_genres(&self, title_id: i64, genre_ids: &[i64]) -> Result<()> {
        for genre_id in genre_ids {
            sqlx::query("INSERT OR IGNORE INTO title_genres (title_id, genre_id) VALUES (?, ?)")
                .bind(title_id)
                .bind(genre_id)
                .execute(self.db.pool())
                .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags::{NewTag, TagStore};

    async fn test_db() -> Database {
        Database::new_in_memory().await.unwrap()
    }

    async fn seed_tags(db: &Database) {
        TagStore::categories(db)
            .create(NewTag {
                name: "Books".to_string(),
                slug: "books".to_string(),
            })
            .await
            .unwrap();
        for (name, slug) in [("Drama", "drama"), ("Comedy", "comedy")] {
            TagStore::genres(db)
                .create(NewTag {
                    name: name.to_string(),
                    slug: slug.to_string(),
                })
                .await
                .unwrap();
        }
    }

    fn title(name: &str, year: i64) -> NewTitle {
        NewTitle {
            name: name.to_string(),
            year,
            description: None,
            category: Some("books".to_string()),
            genre: vec!["drama".to_string()],
        }
    }

    #[tokio::test]
    async fn test_create_with_nested_read() {
        let db = test_db().await;
        seed_tags(&db).await;
        let store = TitleStore::new(&db);

        let created = store.create(title("War and Peace", 1869)).await.unwrap();
        assert_eq!(created.category.as_ref().unwrap().slug, "books");
        assert_eq!(created.genre.len(), 1);
        assert_eq!(created.rating, None);
    }

    #[tokio::test]
    async fn test_unknown_slugs_are_validation_errors() {
        let db = test_db().await;
        seed_tags(&db).await;
        let store = TitleStore::new(&db);

        let mut bad_category = title("X", 2000);
        bad_category.category = Some("missing".to_string());
        assert!(matches!(
            store.create(bad_category).await.unwrap_err(),
            CatalogError::Validation(_)
        ));

        let mut bad_genre = title("X", 2000);
        bad_genre.genre = vec!["missing".to_string()];
        assert!(matches!(
            store.create(bad_genre).await.unwrap_err(),
            CatalogError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn test_year_out_of_bounds() {
        let db = test_db().await;
        seed_tags(&db).await;
        let store = TitleStore::new(&db);

        assert!(matches!(
            store.create(title("Old", 999)).await.unwrap_err(),
            CatalogError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn test_list_orders_by_year_desc() {
        let db = test_db().await;
        seed_tags(&db).await;
        let store = TitleStore::new(&db);

        store.create(title("Older", 1950)).await.unwrap();
        store.create(title("Newer", 2001)).await.unwrap();

        let all = store
            .list(&TitleFilter::default(), 50, 0)
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name, "Newer");
        assert_eq!(all[1].name, "Older");
    }

    #[tokio::test]
    async fn test_list_filters() {
        let db = test_db().await;
        seed_tags(&db).await;
        let store = TitleStore::new(&db);

        store.create(title("War and Peace", 1869)).await.unwrap();
        let mut comedy = title("The Government Inspector", 1836);
        comedy.genre = vec!["comedy".to_string()];
        comedy.category = None;
        store.create(comedy).await.unwrap();

        let by_genre = store
            .list(
                &TitleFilter {
                    genre: Some("comedy".to_string()),
                    ..TitleFilter::default()
                },
                50,
                0,
            )
            .await
            .unwrap();
        assert_eq!(by_genre.len(), 1);
        assert_eq!(by_genre[0].name, "The Government Inspector");

        let by_category = store
            .list(
                &TitleFilter {
                    category: Some("books".to_string()),
                    ..TitleFilter::default()
                },
                50,
                0,
            )
            .await
            .unwrap();
        assert_eq!(by_category.len(), 1);
        assert_eq!(by_category[0].name, "War and Peace");

        let by_name = store
            .list(
                &TitleFilter {
                    name: Some("Peace".to_string()),
                    ..TitleFilter::default()
                },
                50,
                0,
            )
            .await
            .unwrap();
        assert_eq!(by_name.len(), 1);

        let by_year = store
            .list(
                &TitleFilter {
                    year: Some(1836),
                    ..TitleFilter::default()
                },
                50,
                0,
            )
            .await
            .unwrap();
        assert_eq!(by_year.len(), 1);
    }

    #[tokio::test]
    async fn test_category_delete_detaches_titles() {
        let db = test_db().await;
        seed_tags(&db).await;
        let store = TitleStore::new(&db);

        let created = store.create(title("War and Peace", 1869)).await.unwrap();
        TagStore::categories(&db)
            .delete_by_slug("books")
            .await
            .unwrap();

        let fetched = store.get(created.id).await.unwrap();
        assert!(fetched.category.is_none());
    }

    #[tokio::test]
    async fn test_patch_replaces_genres() {
        let db = test_db().await;
        seed_tags(&db).await;
        let store = TitleStore::new(&db);

        let created = store.create(title("War and Peace", 1869)).await.unwrap();
        let updated = store
            .update(
                created.id,
                TitlePatch {
                    genre: Some(vec!["comedy".to_string()]),
                    ..TitlePatch::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.genre.len(), 1);
        assert_eq!(updated.genre[0].slug, "comedy");
        assert_eq!(updated.name, "War and Peace");
    }

    #[tokio::test]
    async fn test_get_missing_title() {
        let db = test_db().await;
        let store = TitleStore::new(&db);
        assert!(matches!(
            store.get(404).await.unwrap_err(),
            CatalogError::NotFound(_)
        ));
    }
}

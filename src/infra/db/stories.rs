use async_trait::async_trait;
use time::OffsetDateTime;

use crate::{
    application::repos::{RepoError, StoriesRepo},
    domain::stories::{NewStory, Story},
};

use super::{SqliteRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct StoryRow {
    id: i64,
    image_id: String,
    body: String,
    language: String,
    created_at: OffsetDateTime,
}

impl From<StoryRow> for Story {
    fn from(row: StoryRow) -> Self {
        Self {
            id: row.id,
            image_id: row.image_id,
            body: row.body,
            language: row.language,
            created_at: row.created_at,
        }
    }
}

const SELECT_COLUMNS: &str = "SELECT id, image_id, body, language, created_at FROM stories";

#[async_trait]
impl StoriesRepo for SqliteRepositories {
    async fn insert_story(&self, story: NewStory) -> Result<i64, RepoError> {
        let result = sqlx::query(
            "INSERT INTO stories (image_id, body, language, remote_addr, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&story.image_id)
        .bind(&story.body)
        .bind(&story.language)
        .bind(&story.remote_addr)
        .bind(OffsetDateTime::now_utc())
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.last_insert_rowid())
    }

    async fn list_recent(&self, limit: u32) -> Result<Vec<Story>, RepoError> {
        let limit = i64::from(limit.clamp(1, 500));
        let rows = sqlx::query_as::<_, StoryRow>(&format!(
            "{SELECT_COLUMNS} ORDER BY created_at DESC, id DESC LIMIT ?1"
        ))
        .bind(limit)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(Story::from).collect())
    }

    async fn list_for_image(&self, image_id: &str) -> Result<Vec<Story>, RepoError> {
        let rows = sqlx::query_as::<_, StoryRow>(&format!(
            "{SELECT_COLUMNS} WHERE image_id = ?1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(image_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(Story::from).collect())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Story>, RepoError> {
        let row = sqlx::query_as::<_, StoryRow>(&format!("{SELECT_COLUMNS} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(Story::from))
    }
}

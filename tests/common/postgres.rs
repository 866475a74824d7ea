//! Postgres-backed harness. Every harness migrates its own schema, so tests
//! share one database without seeing each other's rows. Without
//! `DATABASE_URL` the tests that use it return early.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::Value;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{Executor, PgPool, Row};
use uuid::Uuid;

use devflow_api::actions::Actions;
use devflow_api::auth::Session;
use devflow_api::database::models::{
    Answer, Collection, Question, Tag, TagLink, TargetType, User, Vote, VoteType,
};
use devflow_api::database::{PgStore, Snapshot};

pub struct PgHarness {
    pub store: PgStore,
    pub actions: Actions,
    pool: PgPool,
    admin: PgPool,
    schema: String,
}

impl PgHarness {
    pub async fn connect() -> Result<Option<Self>> {
        let _ = dotenvy::dotenv();
        let Ok(url) = std::env::var("DATABASE_URL") else {
            eprintln!("DATABASE_URL not set, skipping Postgres test");
            return Ok(None);
        };

        let admin = PgPoolOptions::new()
            .max_connections(1)
            .connect(&url)
            .await
            .context("failed to connect to DATABASE_URL")?;
        let schema = format!("devflow_test_{}", Uuid::new_v4().simple());
        sqlx::query(&format!("CREATE SCHEMA {}", schema)).execute(&admin).await?;

        let search_path = format!("SET search_path TO {}", schema);
        let pool = PgPoolOptions::new()
            .max_connections(8)
            .after_connect(move |conn, _meta| {
                let sql = search_path.clone();
                Box::pin(async move {
                    conn.execute(sql.as_str()).await?;
                    Ok(())
                })
            })
            .connect(&url)
            .await?;

        let store = PgStore::from_pool(pool.clone(), Duration::from_secs(5));
        store.migrate().await?;
        let actions = Actions::new(Arc::new(store.clone()));
        Ok(Some(Self { store, actions, pool, admin, schema }))
    }

    /// Drop the schema and close both pools.
    pub async fn cleanup(self) -> Result<()> {
        self.pool.close().await;
        sqlx::query(&format!("DROP SCHEMA {} CASCADE", self.schema))
            .execute(&self.admin)
            .await?;
        self.admin.close().await;
        Ok(())
    }

    pub async fn ask(&self, who: &Session, title: &str, tags: &[&str]) -> Result<Question> {
        super::ask(&self.actions, who, title, tags).await
    }

    pub async fn answer(&self, who: &Session, question_id: Uuid) -> Result<Answer> {
        super::answer(&self.actions, who, question_id).await
    }

    pub async fn vote(&self, who: &Session, target_id: Uuid, target_type: &str, vote_type: VoteType) -> Result<Value> {
        super::vote(&self.actions, who, target_id, target_type, vote_type).await
    }

    /// Every table read straight from the schema, sorted by id.
    pub async fn snapshot(&self) -> Result<Snapshot> {
        let votes = sqlx::query(
            "SELECT id, author_id, target_id, target_type, vote_type, created_at, updated_at FROM votes ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(vote_from_row)
        .collect::<Result<Vec<_>>>()?;

        Ok(Snapshot {
            users: sqlx::query_as::<_, User>(
                "SELECT id, name, username, email, image, created_at, updated_at FROM users ORDER BY id",
            )
            .fetch_all(&self.pool)
            .await?,
            questions: sqlx::query_as::<_, Question>(
                "SELECT id, title, content, author_id, tags, answers, upvotes, downvotes, views, created_at, updated_at \
                 FROM questions ORDER BY id",
            )
            .fetch_all(&self.pool)
            .await?,
            answers: sqlx::query_as::<_, Answer>(
                "SELECT id, question_id, author_id, content, upvotes, downvotes, created_at, updated_at \
                 FROM answers ORDER BY id",
            )
            .fetch_all(&self.pool)
            .await?,
            tags: sqlx::query_as::<_, Tag>("SELECT id, name, questions, created_at FROM tags ORDER BY id")
                .fetch_all(&self.pool)
                .await?,
            tag_links: sqlx::query_as::<_, TagLink>(
                "SELECT id, tag_id, question_id, created_at FROM tag_questions ORDER BY id",
            )
            .fetch_all(&self.pool)
            .await?,
            votes,
            collections: sqlx::query_as::<_, Collection>(
                "SELECT id, author_id, question_id, created_at FROM collections ORDER BY id",
            )
            .fetch_all(&self.pool)
            .await?,
        })
    }
}

fn vote_from_row(row: &PgRow) -> Result<Vote> {
    let target_type: String = row.try_get("target_type")?;
    let vote_type: String = row.try_get("vote_type")?;
    Ok(Vote {
        id: row.try_get("id")?,
        author_id: row.try_get("author_id")?,
        target_id: row.try_get("target_id")?,
        target_type: target_type.parse::<TargetType>().map_err(anyhow::Error::msg)?,
        vote_type: vote_type.parse::<VoteType>().map_err(anyhow::Error::msg)?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgRow};
use sqlx::{ConnectOptions, FromRow, PgPool, Postgres, Row, Transaction};
use tracing::{debug, info};
use uuid::Uuid;

use super::error::StoreError;
use super::models::{
    Answer, AnswerView, AuthorSummary, Collection, Question, QuestionView, SavedQuestionView, Tag,
    TagLink, TagSummary, TargetType, User, Vote, VoteType,
};
use super::store::{Counter, PageSlice, Store, StoreTx};
use crate::config::DatabaseConfig;
use crate::filter::{AnswerSort, FilterOrder, Pagination, SavedQuestionSort, TextSearch};

const USER_COLUMNS: &str = "id, name, username, email, image, created_at, updated_at";
const QUESTION_COLUMNS: &str =
    "id, title, content, author_id, tags, answers, upvotes, downvotes, views, created_at, updated_at";
const ANSWER_COLUMNS: &str = "id, question_id, author_id, content, upvotes, downvotes, created_at, updated_at";
const TAG_COLUMNS: &str = "id, name, questions, created_at";
const VOTE_COLUMNS: &str = "id, author_id, target_id, target_type, vote_type, created_at, updated_at";
const COLLECTION_COLUMNS: &str = "id, author_id, question_id, created_at";

/// Postgres-backed store. Transactions run at READ COMMITTED; rows read
/// ahead of a write are locked with `FOR UPDATE` and every counter change is
/// a single `col = col + $n` statement.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    tx_timeout: Duration,
}

impl PgStore {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let raw = config.url.as_deref().ok_or(StoreError::ConfigMissing("DATABASE_URL"))?;
        let parsed = url::Url::parse(raw).map_err(|_| StoreError::InvalidDatabaseUrl)?;

        let mut options: PgConnectOptions = raw.parse().map_err(|_| StoreError::InvalidDatabaseUrl)?;
        if !config.enable_query_logging {
            options = options.disable_statement_logging();
        }

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect_with(options)
            .await?;

        info!("Connected to Postgres at {}", redact(&parsed));
        Ok(Self::from_pool(pool, Duration::from_millis(config.transaction_timeout_ms)))
    }

    pub fn from_pool(pool: PgPool, tx_timeout: Duration) -> Self {
        Self { pool, tx_timeout }
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations applied");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!("Closed database pool");
    }

    async fn tags_by_id(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, TagSummary>, StoreError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query_as::<_, TagSummary>("SELECT id, name FROM tags WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|t| (t.id, t)).collect())
    }
}

/// Drop the password before a connection URL reaches the logs.
fn redact(url: &url::Url) -> String {
    let mut url = url.clone();
    if url.password().is_some() {
        let _ = url.set_password(Some("****"));
    }
    url.to_string()
}

fn author_from_row(row: &PgRow, id_column: &str) -> Result<Option<AuthorSummary>, sqlx::Error> {
    let name: Option<String> = row.try_get("author_name")?;
    Ok(match name {
        Some(name) => Some(AuthorSummary {
            id: row.try_get(id_column)?,
            name,
            image: row.try_get("author_image")?,
        }),
        None => None,
    })
}

fn vote_from_row(row: &PgRow) -> Result<Vote, StoreError> {
    let target_type: String = row.try_get("target_type")?;
    let vote_type: String = row.try_get("vote_type")?;
    Ok(Vote {
        id: row.try_get("id")?,
        author_id: row.try_get("author_id")?,
        target_id: row.try_get("target_id")?,
        target_type: target_type.parse().map_err(StoreError::QueryError)?,
        vote_type: vote_type.parse().map_err(StoreError::QueryError)?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn ordered_tags(question: &Question, tags: &HashMap<Uuid, TagSummary>) -> Vec<TagSummary> {
    question.tags.iter().filter_map(|id| tags.get(id).cloned()).collect()
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError> {
        let mut tx = tokio::time::timeout(self.tx_timeout, self.pool.begin())
            .await
            .map_err(|_| StoreError::Timeout(format!("could not begin transaction within {:?}", self.tx_timeout)))??;

        let ms = self.tx_timeout.as_millis();
        sqlx::query("SET TRANSACTION ISOLATION LEVEL READ COMMITTED")
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("SET LOCAL statement_timeout = {}", ms))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("SET LOCAL lock_timeout = {}", ms))
            .execute(&mut *tx)
            .await?;

        Ok(Box::new(PgTx { tx, tx_timeout: self.tx_timeout }))
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn question_view(&self, id: Uuid) -> Result<Option<QuestionView>, StoreError> {
        const SQL: &str = "SELECT q.*, u.name AS author_name, u.image AS author_image \
             FROM questions q LEFT JOIN users u ON u.id = q.author_id WHERE q.id = $1";
        let Some(row) = sqlx::query(SQL).bind(id).fetch_optional(&self.pool).await? else {
            return Ok(None);
        };
        let question = Question::from_row(&row)?;
        let author = author_from_row(&row, "author_id")?;
        let tags = self.tags_by_id(&question.tags).await?;
        let tags = ordered_tags(&question, &tags);
        Ok(Some(QuestionView::assemble(question, author, tags)))
    }

    async fn answers_page(
        &self,
        question_id: Uuid,
        sort: AnswerSort,
        page: Pagination,
    ) -> Result<PageSlice<AnswerView>, StoreError> {
        let sql = format!(
            "SELECT a.*, u.name AS author_name, u.image AS author_image \
             FROM answers a LEFT JOIN users u ON u.id = a.author_id \
             WHERE a.question_id = $1 {} LIMIT $2 OFFSET $3",
            FilterOrder::generate(&sort.order(), Some("a"))
        );
        debug!("answers_page: {}", sql);

        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM answers WHERE question_id = $1")
            .bind(question_id)
            .fetch_one(&self.pool);
        let rows = sqlx::query(&sql)
            .bind(question_id)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool);
        let (total, rows) = futures::try_join!(count, rows)?;

        let items = rows
            .iter()
            .map(|row| {
                let answer = Answer::from_row(row)?;
                let author = author_from_row(row, "author_id")?;
                Ok(AnswerView::assemble(answer, author))
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()?;
        Ok(PageSlice { items, total })
    }

    async fn saved_questions_page(
        &self,
        user_id: Uuid,
        search: Option<&TextSearch>,
        sort: SavedQuestionSort,
        page: Pagination,
    ) -> Result<PageSlice<SavedQuestionView>, StoreError> {
        const FROM: &str = "FROM collections c \
             JOIN questions q ON q.id = c.question_id \
             JOIN users u ON u.id = q.author_id \
             WHERE c.author_id = $1 \
               AND ($2::text IS NULL OR q.title ILIKE $2 ESCAPE '\\' OR q.content ILIKE $2 ESCAPE '\\')";

        let pattern = search.map(TextSearch::to_ilike_pattern);
        let count_sql = format!("SELECT COUNT(*) {}", FROM);
        let page_sql = format!(
            "SELECT c.id AS collection_id, c.created_at AS saved_at, q.*, \
                    u.name AS author_name, u.image AS author_image {} {} LIMIT $3 OFFSET $4",
            FROM,
            FilterOrder::generate(&sort.order(), Some("q"))
        );
        debug!("saved_questions_page: {}", page_sql);

        let count = sqlx::query_scalar::<_, i64>(&count_sql)
            .bind(user_id)
            .bind(pattern.as_deref())
            .fetch_one(&self.pool);
        let rows = sqlx::query(&page_sql)
            .bind(user_id)
            .bind(pattern.as_deref())
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool);
        let (total, rows) = futures::try_join!(count, rows)?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in &rows {
            let collection_id: Uuid = row.try_get("collection_id")?;
            let saved_at: chrono::DateTime<chrono::Utc> = row.try_get("saved_at")?;
            let question = Question::from_row(row)?;
            let author = author_from_row(row, "author_id")?;
            entries.push((collection_id, saved_at, question, author));
        }

        let tag_ids: Vec<Uuid> = entries.iter().flat_map(|(_, _, q, _)| q.tags.iter().copied()).collect();
        let tags = self.tags_by_id(&tag_ids).await?;

        let items = entries
            .into_iter()
            .map(|(collection_id, saved_at, question, author)| {
                let resolved = ordered_tags(&question, &tags);
                SavedQuestionView {
                    collection_id,
                    saved_at,
                    question: QuestionView::assemble(question, author, resolved),
                }
            })
            .collect();
        Ok(PageSlice { items, total })
    }

    async fn find_vote(
        &self,
        author_id: Uuid,
        target_id: Uuid,
        target_type: TargetType,
    ) -> Result<Option<Vote>, StoreError> {
        let sql = format!(
            "SELECT {} FROM votes WHERE author_id = $1 AND target_id = $2 AND target_type = $3",
            VOTE_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(author_id)
            .bind(target_id)
            .bind(target_type.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(vote_from_row).transpose()
    }

    async fn find_collection(
        &self,
        author_id: Uuid,
        question_id: Uuid,
    ) -> Result<Option<Collection>, StoreError> {
        let sql = format!(
            "SELECT {} FROM collections WHERE author_id = $1 AND question_id = $2",
            COLLECTION_COLUMNS
        );
        Ok(sqlx::query_as::<_, Collection>(&sql)
            .bind(author_id)
            .bind(question_id)
            .fetch_optional(&self.pool)
            .await?)
    }
}

pub struct PgTx {
    tx: Transaction<'static, Postgres>,
    tx_timeout: Duration,
}

#[async_trait]
impl StoreTx for PgTx {
    async fn upsert_user(&mut self, user: &User) -> Result<User, StoreError> {
        let sql = format!(
            "INSERT INTO users ({cols}) VALUES ($1, $2, $3, $4, $5, $6, $6) \
             ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name, username = EXCLUDED.username, \
                 email = EXCLUDED.email, image = EXCLUDED.image, updated_at = EXCLUDED.updated_at \
             RETURNING {cols}",
            cols = USER_COLUMNS
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(user.id)
            .bind(&user.name)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.image)
            .bind(chrono::Utc::now())
            .fetch_one(&mut *self.tx)
            .await?)
    }

    async fn insert_user_if_absent(&mut self, user: &User) -> Result<bool, StoreError> {
        let sql = format!(
            "INSERT INTO users ({}) VALUES ($1, $2, $3, $4, $5, $6, $7) ON CONFLICT (id) DO NOTHING",
            USER_COLUMNS
        );
        let result = sqlx::query(&sql)
            .bind(user.id)
            .bind(&user.name)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.image)
            .bind(user.created_at)
            .bind(user.updated_at)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_question(&mut self, id: Uuid) -> Result<Option<Question>, StoreError> {
        let sql = format!("SELECT {} FROM questions WHERE id = $1 FOR UPDATE", QUESTION_COLUMNS);
        Ok(sqlx::query_as::<_, Question>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?)
    }

    async fn insert_question(&mut self, question: &Question) -> Result<(), StoreError> {
        let sql = format!(
            "INSERT INTO questions ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
            QUESTION_COLUMNS
        );
        sqlx::query(&sql)
            .bind(question.id)
            .bind(&question.title)
            .bind(&question.content)
            .bind(question.author_id)
            .bind(&question.tags)
            .bind(question.answers)
            .bind(question.upvotes)
            .bind(question.downvotes)
            .bind(question.views)
            .bind(question.created_at)
            .bind(question.updated_at)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn update_question_text(&mut self, id: Uuid, title: &str, content: &str) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE questions SET title = $2, content = $3, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(title)
            .bind(content)
            .execute(&mut *self.tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("question {}", id)));
        }
        Ok(())
    }

    async fn set_question_tags(&mut self, id: Uuid, tags: &[Uuid]) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE questions SET tags = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(tags)
            .execute(&mut *self.tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("question {}", id)));
        }
        Ok(())
    }

    async fn delete_question(&mut self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM questions WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn upsert_tag_increment(&mut self, name: &str) -> Result<Tag, StoreError> {
        let sql = format!(
            "INSERT INTO tags ({cols}) VALUES ($1, $2, 1, $3) \
             ON CONFLICT ((lower(name))) DO UPDATE SET questions = tags.questions + 1 \
             RETURNING {cols}",
            cols = TAG_COLUMNS
        );
        Ok(sqlx::query_as::<_, Tag>(&sql)
            .bind(Uuid::new_v4())
            .bind(name.trim())
            .bind(chrono::Utc::now())
            .fetch_one(&mut *self.tx)
            .await?)
    }

    async fn find_tags(&mut self, ids: &[Uuid]) -> Result<Vec<Tag>, StoreError> {
        let sql = format!("SELECT {} FROM tags WHERE id = ANY($1)", TAG_COLUMNS);
        let mut rows: HashMap<Uuid, Tag> = sqlx::query_as::<_, Tag>(&sql)
            .bind(ids)
            .fetch_all(&mut *self.tx)
            .await?
            .into_iter()
            .map(|t| (t.id, t))
            .collect();
        Ok(ids.iter().filter_map(|id| rows.remove(id)).collect())
    }

    async fn insert_tag_link(&mut self, link: &TagLink) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO tag_questions (id, tag_id, question_id, created_at) VALUES ($1, $2, $3, $4)")
            .bind(link.id)
            .bind(link.tag_id)
            .bind(link.question_id)
            .bind(link.created_at)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn delete_tag_links(&mut self, question_id: Uuid, tag_ids: &[Uuid]) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM tag_questions WHERE question_id = $1 AND tag_id = ANY($2)")
            .bind(question_id)
            .bind(tag_ids)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn find_answer(&mut self, id: Uuid) -> Result<Option<Answer>, StoreError> {
        let sql = format!("SELECT {} FROM answers WHERE id = $1 FOR UPDATE", ANSWER_COLUMNS);
        Ok(sqlx::query_as::<_, Answer>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?)
    }

    async fn answer_parent(&mut self, id: Uuid) -> Result<Option<Uuid>, StoreError> {
        Ok(sqlx::query_scalar::<_, Uuid>("SELECT question_id FROM answers WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?)
    }

    async fn insert_answer(&mut self, answer: &Answer) -> Result<(), StoreError> {
        let sql = format!("INSERT INTO answers ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)", ANSWER_COLUMNS);
        sqlx::query(&sql)
            .bind(answer.id)
            .bind(answer.question_id)
            .bind(answer.author_id)
            .bind(&answer.content)
            .bind(answer.upvotes)
            .bind(answer.downvotes)
            .bind(answer.created_at)
            .bind(answer.updated_at)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn delete_answer(&mut self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM answers WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn answer_ids_for_question(&mut self, question_id: Uuid) -> Result<Vec<Uuid>, StoreError> {
        // locks out votes still being cast on these answers before their votes are swept
        Ok(sqlx::query_scalar::<_, Uuid>("SELECT id FROM answers WHERE question_id = $1 ORDER BY id FOR UPDATE")
            .bind(question_id)
            .fetch_all(&mut *self.tx)
            .await?)
    }

    async fn delete_answers_for_question(&mut self, question_id: Uuid) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM answers WHERE question_id = $1")
            .bind(question_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn find_vote(
        &mut self,
        author_id: Uuid,
        target_id: Uuid,
        target_type: TargetType,
    ) -> Result<Option<Vote>, StoreError> {
        let sql = format!(
            "SELECT {} FROM votes WHERE author_id = $1 AND target_id = $2 AND target_type = $3 FOR UPDATE",
            VOTE_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(author_id)
            .bind(target_id)
            .bind(target_type.as_str())
            .fetch_optional(&mut *self.tx)
            .await?;
        row.as_ref().map(vote_from_row).transpose()
    }

    async fn insert_vote(&mut self, vote: &Vote) -> Result<(), StoreError> {
        let sql = format!("INSERT INTO votes ({}) VALUES ($1, $2, $3, $4, $5, $6, $7)", VOTE_COLUMNS);
        sqlx::query(&sql)
            .bind(vote.id)
            .bind(vote.author_id)
            .bind(vote.target_id)
            .bind(vote.target_type.as_str())
            .bind(vote.vote_type.as_str())
            .bind(vote.created_at)
            .bind(vote.updated_at)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn update_vote_type(&mut self, id: Uuid, vote_type: VoteType) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE votes SET vote_type = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(vote_type.as_str())
            .execute(&mut *self.tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("vote {}", id)));
        }
        Ok(())
    }

    async fn delete_vote(&mut self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM votes WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_votes_for_target(&mut self, target_id: Uuid, target_type: TargetType) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM votes WHERE target_id = $1 AND target_type = $2")
            .bind(target_id)
            .bind(target_type.as_str())
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn find_collection(&mut self, author_id: Uuid, question_id: Uuid) -> Result<Option<Collection>, StoreError> {
        let sql = format!(
            "SELECT {} FROM collections WHERE author_id = $1 AND question_id = $2 FOR UPDATE",
            COLLECTION_COLUMNS
        );
        Ok(sqlx::query_as::<_, Collection>(&sql)
            .bind(author_id)
            .bind(question_id)
            .fetch_optional(&mut *self.tx)
            .await?)
    }

    async fn insert_collection(&mut self, collection: &Collection) -> Result<(), StoreError> {
        let sql = format!("INSERT INTO collections ({}) VALUES ($1, $2, $3, $4)", COLLECTION_COLUMNS);
        sqlx::query(&sql)
            .bind(collection.id)
            .bind(collection.author_id)
            .bind(collection.question_id)
            .bind(collection.created_at)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn delete_collection(&mut self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM collections WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_collections_for_question(&mut self, question_id: Uuid) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM collections WHERE question_id = $1")
            .bind(question_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn increment(&mut self, counter: Counter, id: Uuid, delta: i64) -> Result<bool, StoreError> {
        // table and column come from a closed enum, never from input
        let sql = format!(
            "UPDATE {table} SET {col} = {col} + $1 WHERE id = $2",
            table = counter.table(),
            col = counter.column()
        );
        let result = sqlx::query(&sql)
            .bind(delta)
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let PgTx { tx, tx_timeout } = *self;
        tokio::time::timeout(tx_timeout, tx.commit())
            .await
            .map_err(|_| StoreError::Timeout(format!("commit did not finish within {:?}", tx_timeout)))??;
        Ok(())
    }

    async fn abort(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.rollback().await?;
        Ok(())
    }
}

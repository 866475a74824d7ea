//! In-process storage backend.
//!
//! A single `tokio::sync::Mutex` guards all tables. A transaction owns the
//! guard for its whole lifetime, which gives serializable isolation for free.
//! Writes land in place and are recorded in an undo log; `abort` or dropping
//! an unfinished transaction replays the log in reverse.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, MutexGuard, OwnedMutexGuard};
use uuid::Uuid;

use super::error::StoreError;
use super::models::{
    tag_key, Answer, AnswerView, AuthorSummary, Collection, Question, QuestionView,
    SavedQuestionView, Tag, TagLink, TagSummary, TargetType, User, Vote, VoteType,
};
use super::store::{Counter, PageSlice, Store, StoreTx};
use crate::filter::{AnswerSort, Pagination, SavedQuestionSort, TextSearch};

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    questions: HashMap<Uuid, Question>,
    answers: HashMap<Uuid, Answer>,
    tags: HashMap<Uuid, Tag>,
    tag_links: HashMap<Uuid, TagLink>,
    votes: HashMap<Uuid, Vote>,
    collections: HashMap<Uuid, Collection>,
}

impl Tables {
    fn author(&self, id: Uuid) -> Option<AuthorSummary> {
        self.users.get(&id).map(AuthorSummary::from)
    }

    fn question_view(&self, question: &Question) -> QuestionView {
        let tags = question
            .tags
            .iter()
            .filter_map(|id| self.tags.get(id))
            .map(TagSummary::from)
            .collect();
        QuestionView::assemble(question.clone(), self.author(question.author_id), tags)
    }
}

/// Prior value of a row, captured before the transaction touched it.
#[derive(Debug)]
enum Undo {
    User(Uuid, Option<User>),
    Question(Uuid, Option<Question>),
    Answer(Uuid, Option<Answer>),
    Tag(Uuid, Option<Tag>),
    TagLink(Uuid, Option<TagLink>),
    Vote(Uuid, Option<Vote>),
    Collection(Uuid, Option<Collection>),
}

trait Row: Clone + Sized {
    fn key(&self) -> Uuid;
    fn table(tables: &mut Tables) -> &mut HashMap<Uuid, Self>;
    fn undo(id: Uuid, prior: Option<Self>) -> Undo;
}

macro_rules! impl_row {
    ($ty:ty, $field:ident, $variant:ident) => {
        impl Row for $ty {
            fn key(&self) -> Uuid {
                self.id
            }

            fn table(tables: &mut Tables) -> &mut HashMap<Uuid, Self> {
                &mut tables.$field
            }

            fn undo(id: Uuid, prior: Option<Self>) -> Undo {
                Undo::$variant(id, prior)
            }
        }
    };
}

impl_row!(User, users, User);
impl_row!(Question, questions, Question);
impl_row!(Answer, answers, Answer);
impl_row!(Tag, tags, Tag);
impl_row!(TagLink, tag_links, TagLink);
impl_row!(Vote, votes, Vote);
impl_row!(Collection, collections, Collection);

fn restore<R: Row>(tables: &mut Tables, id: Uuid, prior: Option<R>) {
    let table = R::table(tables);
    match prior {
        Some(row) => {
            table.insert(id, row);
        }
        None => {
            table.remove(&id);
        }
    }
}

impl Undo {
    fn apply(self, tables: &mut Tables) {
        match self {
            Undo::User(id, prior) => restore(tables, id, prior),
            Undo::Question(id, prior) => restore(tables, id, prior),
            Undo::Answer(id, prior) => restore(tables, id, prior),
            Undo::Tag(id, prior) => restore(tables, id, prior),
            Undo::TagLink(id, prior) => restore(tables, id, prior),
            Undo::Vote(id, prior) => restore(tables, id, prior),
            Undo::Collection(id, prior) => restore(tables, id, prior),
        }
    }
}

/// Point-in-time copy of every table, each sorted by id, for inspection and
/// invariant checks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub users: Vec<User>,
    pub questions: Vec<Question>,
    pub answers: Vec<Answer>,
    pub tags: Vec<Tag>,
    pub tag_links: Vec<TagLink>,
    pub votes: Vec<Vote>,
    pub collections: Vec<Collection>,
}

impl Snapshot {
    pub fn tag(&self, name: &str) -> Option<&Tag> {
        let key = tag_key(name);
        self.tags.iter().find(|t| tag_key(&t.name) == key)
    }

    pub fn question(&self, id: Uuid) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    pub fn answer(&self, id: Uuid) -> Option<&Answer> {
        self.answers.iter().find(|a| a.id == id)
    }
}

#[derive(Clone)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    tx_timeout: Duration,
}

impl MemoryStore {
    pub fn new() -> Self {
        let timeout = crate::config::CONFIG.database.transaction_timeout_ms;
        Self::with_timeout(Duration::from_millis(timeout))
    }

    pub fn with_timeout(tx_timeout: Duration) -> Self {
        Self {
            tables: Arc::new(Mutex::new(Tables::default())),
            tx_timeout,
        }
    }

    /// Copy all tables. Waits like any other read.
    pub async fn snapshot(&self) -> Result<Snapshot, StoreError> {
        fn sorted<R: Row>(table: &HashMap<Uuid, R>) -> Vec<R> {
            let mut rows: Vec<R> = table.values().cloned().collect();
            rows.sort_by_key(|r| r.key());
            rows
        }

        let tables = self.read().await?;
        Ok(Snapshot {
            users: sorted(&tables.users),
            questions: sorted(&tables.questions),
            answers: sorted(&tables.answers),
            tags: sorted(&tables.tags),
            tag_links: sorted(&tables.tag_links),
            votes: sorted(&tables.votes),
            collections: sorted(&tables.collections),
        })
    }

    async fn read(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        tokio::time::timeout(self.tx_timeout, self.tables.lock())
            .await
            .map_err(|_| StoreError::Timeout(format!("store busy for more than {:?}", self.tx_timeout)))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError> {
        let guard = tokio::time::timeout(self.tx_timeout, self.tables.clone().lock_owned())
            .await
            .map_err(|_| {
                StoreError::Timeout(format!("could not begin transaction within {:?}", self.tx_timeout))
            })?;
        Ok(Box::new(MemoryTx { guard: Some(guard), undo: Vec::new() }))
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        self.read().await.map(|_| ())
    }

    async fn question_view(&self, id: Uuid) -> Result<Option<QuestionView>, StoreError> {
        let tables = self.read().await?;
        Ok(tables.questions.get(&id).map(|q| tables.question_view(q)))
    }

    async fn answers_page(
        &self,
        question_id: Uuid,
        sort: AnswerSort,
        page: Pagination,
    ) -> Result<PageSlice<AnswerView>, StoreError> {
        let tables = self.read().await?;
        let mut rows: Vec<&Answer> = tables
            .answers
            .values()
            .filter(|a| a.question_id == question_id)
            .collect();
        rows.sort_by(|a, b| compare_answers(sort, a, b));

        let total = rows.len() as i64;
        let items = rows
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .map(|a| AnswerView::assemble(a.clone(), tables.author(a.author_id)))
            .collect();
        Ok(PageSlice { items, total })
    }

    async fn saved_questions_page(
        &self,
        user_id: Uuid,
        search: Option<&TextSearch>,
        sort: SavedQuestionSort,
        page: Pagination,
    ) -> Result<PageSlice<SavedQuestionView>, StoreError> {
        let tables = self.read().await?;
        let mut rows: Vec<(&Collection, &Question)> = tables
            .collections
            .values()
            .filter(|c| c.author_id == user_id)
            .filter_map(|c| tables.questions.get(&c.question_id).map(|q| (c, q)))
            // inner join on the author, like the SQL backend
            .filter(|(_, q)| tables.users.contains_key(&q.author_id))
            .filter(|(_, q)| match search {
                Some(s) => s.matches(&q.title) || s.matches(&q.content),
                None => true,
            })
            .collect();
        rows.sort_by(|(_, a), (_, b)| compare_questions(sort, a, b));

        let total = rows.len() as i64;
        let items = rows
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .map(|(c, q)| SavedQuestionView {
                collection_id: c.id,
                saved_at: c.created_at,
                question: tables.question_view(q),
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
        let tables = self.read().await?;
        Ok(find_vote_in(&tables, author_id, target_id, target_type).cloned())
    }

    async fn find_collection(
        &self,
        author_id: Uuid,
        question_id: Uuid,
    ) -> Result<Option<Collection>, StoreError> {
        let tables = self.read().await?;
        Ok(find_collection_in(&tables, author_id, question_id).cloned())
    }
}

fn compare_answers(sort: AnswerSort, a: &Answer, b: &Answer) -> Ordering {
    match sort {
        AnswerSort::Latest => b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)),
        AnswerSort::Oldest => a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)),
        AnswerSort::Popular => b
            .upvotes
            .cmp(&a.upvotes)
            .then(b.created_at.cmp(&a.created_at))
            .then(b.id.cmp(&a.id)),
    }
}

fn compare_questions(sort: SavedQuestionSort, a: &Question, b: &Question) -> Ordering {
    let primary = match sort {
        SavedQuestionSort::MostRecent => b.created_at.cmp(&a.created_at),
        SavedQuestionSort::Oldest => a.created_at.cmp(&b.created_at),
        SavedQuestionSort::MostVoted => b.upvotes.cmp(&a.upvotes),
        SavedQuestionSort::MostViewed => b.views.cmp(&a.views),
        SavedQuestionSort::MostAnswered => b.answers.cmp(&a.answers),
    };
    primary.then(b.id.cmp(&a.id))
}

fn find_vote_in(tables: &Tables, author_id: Uuid, target_id: Uuid, target_type: TargetType) -> Option<&Vote> {
    tables
        .votes
        .values()
        .find(|v| v.author_id == author_id && v.target_id == target_id && v.target_type == target_type)
}

fn find_collection_in(tables: &Tables, author_id: Uuid, question_id: Uuid) -> Option<&Collection> {
    tables
        .collections
        .values()
        .find(|c| c.author_id == author_id && c.question_id == question_id)
}

fn bump(value: &mut i64, delta: i64, counter: Counter, id: Uuid) -> Result<(), StoreError> {
    let next = *value + delta;
    if next < 0 {
        return Err(StoreError::Integrity(format!(
            "{}.{} of {} would become {}",
            counter.table(),
            counter.column(),
            id,
            next
        )));
    }
    *value = next;
    Ok(())
}

pub struct MemoryTx {
    guard: Option<OwnedMutexGuard<Tables>>,
    undo: Vec<Undo>,
}

impl MemoryTx {
    fn tables(&self) -> Result<&Tables, StoreError> {
        self.guard.as_deref().ok_or_else(finished)
    }

    fn put<R: Row>(&mut self, row: R) -> Result<Option<R>, StoreError> {
        let id = row.key();
        let tables = self.guard.as_deref_mut().ok_or_else(finished)?;
        let prior = R::table(tables).insert(id, row);
        self.undo.push(R::undo(id, prior.clone()));
        Ok(prior)
    }

    fn take<R: Row>(&mut self, id: Uuid) -> Result<Option<R>, StoreError> {
        let tables = self.guard.as_deref_mut().ok_or_else(finished)?;
        let prior = R::table(tables).remove(&id);
        if prior.is_some() {
            self.undo.push(R::undo(id, prior.clone()));
        }
        Ok(prior)
    }

    fn rollback(&mut self) {
        if let Some(tables) = self.guard.as_deref_mut() {
            for undo in self.undo.drain(..).rev() {
                undo.apply(tables);
            }
        }
    }
}

fn finished() -> StoreError {
    StoreError::QueryError("transaction already finished".to_string())
}

impl Drop for MemoryTx {
    fn drop(&mut self) {
        if !self.undo.is_empty() {
            tracing::debug!("Rolling back {} uncommitted memory-store writes", self.undo.len());
            self.rollback();
        }
    }
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn upsert_user(&mut self, user: &User) -> Result<User, StoreError> {
        let mut row = user.clone();
        if let Some(existing) = self.tables()?.users.get(&user.id) {
            row.created_at = existing.created_at;
        }
        row.updated_at = Utc::now();
        self.put(row.clone())?;
        Ok(row)
    }

    async fn insert_user_if_absent(&mut self, user: &User) -> Result<bool, StoreError> {
        if self.tables()?.users.contains_key(&user.id) {
            return Ok(false);
        }
        self.put(user.clone())?;
        Ok(true)
    }

    async fn find_question(&mut self, id: Uuid) -> Result<Option<Question>, StoreError> {
        Ok(self.tables()?.questions.get(&id).cloned())
    }

    async fn insert_question(&mut self, question: &Question) -> Result<(), StoreError> {
        if self.tables()?.questions.contains_key(&question.id) {
            return Err(StoreError::Conflict(format!("question {} already exists", question.id)));
        }
        self.put(question.clone())?;
        Ok(())
    }

    async fn update_question_text(&mut self, id: Uuid, title: &str, content: &str) -> Result<(), StoreError> {
        let mut question = self
            .tables()?
            .questions
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("question {}", id)))?;
        question.title = title.to_string();
        question.content = content.to_string();
        question.updated_at = Utc::now();
        self.put(question)?;
        Ok(())
    }

    async fn set_question_tags(&mut self, id: Uuid, tags: &[Uuid]) -> Result<(), StoreError> {
        let mut question = self
            .tables()?
            .questions
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("question {}", id)))?;
        question.tags = tags.to_vec();
        question.updated_at = Utc::now();
        self.put(question)?;
        Ok(())
    }

    async fn delete_question(&mut self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.take::<Question>(id)?.is_some())
    }

    async fn upsert_tag_increment(&mut self, name: &str) -> Result<Tag, StoreError> {
        let key = tag_key(name);
        let existing = self.tables()?.tags.values().find(|t| tag_key(&t.name) == key).cloned();
        let tag = match existing {
            Some(mut tag) => {
                bump(&mut tag.questions, 1, Counter::TagQuestions, tag.id)?;
                tag
            }
            None => Tag {
                id: Uuid::new_v4(),
                name: name.trim().to_string(),
                questions: 1,
                created_at: Utc::now(),
            },
        };
        self.put(tag.clone())?;
        Ok(tag)
    }

    async fn find_tags(&mut self, ids: &[Uuid]) -> Result<Vec<Tag>, StoreError> {
        let tables = self.tables()?;
        Ok(ids.iter().filter_map(|id| tables.tags.get(id).cloned()).collect())
    }

    async fn insert_tag_link(&mut self, link: &TagLink) -> Result<(), StoreError> {
        let tables = self.tables()?;
        if !tables.tags.contains_key(&link.tag_id) || !tables.questions.contains_key(&link.question_id) {
            return Err(StoreError::Integrity(format!(
                "tag link {} references a missing tag or question",
                link.id
            )));
        }
        if tables
            .tag_links
            .values()
            .any(|l| l.tag_id == link.tag_id && l.question_id == link.question_id)
        {
            return Err(StoreError::Conflict(format!(
                "tag {} already linked to question {}",
                link.tag_id, link.question_id
            )));
        }
        self.put(link.clone())?;
        Ok(())
    }

    async fn delete_tag_links(&mut self, question_id: Uuid, tag_ids: &[Uuid]) -> Result<u64, StoreError> {
        let doomed: Vec<Uuid> = self
            .tables()?
            .tag_links
            .values()
            .filter(|l| l.question_id == question_id && tag_ids.contains(&l.tag_id))
            .map(|l| l.id)
            .collect();
        for id in &doomed {
            self.take::<TagLink>(*id)?;
        }
        Ok(doomed.len() as u64)
    }

    async fn find_answer(&mut self, id: Uuid) -> Result<Option<Answer>, StoreError> {
        Ok(self.tables()?.answers.get(&id).cloned())
    }

    async fn answer_parent(&mut self, id: Uuid) -> Result<Option<Uuid>, StoreError> {
        Ok(self.tables()?.answers.get(&id).map(|a| a.question_id))
    }

    async fn insert_answer(&mut self, answer: &Answer) -> Result<(), StoreError> {
        let tables = self.tables()?;
        if !tables.questions.contains_key(&answer.question_id) {
            return Err(StoreError::Integrity(format!(
                "answer {} references missing question {}",
                answer.id, answer.question_id
            )));
        }
        if tables.answers.contains_key(&answer.id) {
            return Err(StoreError::Conflict(format!("answer {} already exists", answer.id)));
        }
        self.put(answer.clone())?;
        Ok(())
    }

    async fn delete_answer(&mut self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.take::<Answer>(id)?.is_some())
    }

    async fn answer_ids_for_question(&mut self, question_id: Uuid) -> Result<Vec<Uuid>, StoreError> {
        Ok(self
            .tables()?
            .answers
            .values()
            .filter(|a| a.question_id == question_id)
            .map(|a| a.id)
            .collect())
    }

    async fn delete_answers_for_question(&mut self, question_id: Uuid) -> Result<u64, StoreError> {
        let ids = self.answer_ids_for_question(question_id).await?;
        for id in &ids {
            self.take::<Answer>(*id)?;
        }
        Ok(ids.len() as u64)
    }

    async fn find_vote(
        &mut self,
        author_id: Uuid,
        target_id: Uuid,
        target_type: TargetType,
    ) -> Result<Option<Vote>, StoreError> {
        Ok(find_vote_in(self.tables()?, author_id, target_id, target_type).cloned())
    }

    async fn insert_vote(&mut self, vote: &Vote) -> Result<(), StoreError> {
        if find_vote_in(self.tables()?, vote.author_id, vote.target_id, vote.target_type).is_some() {
            return Err(StoreError::Conflict(format!(
                "user {} already voted on {} {}",
                vote.author_id, vote.target_type, vote.target_id
            )));
        }
        self.put(vote.clone())?;
        Ok(())
    }

    async fn update_vote_type(&mut self, id: Uuid, vote_type: VoteType) -> Result<(), StoreError> {
        let mut vote = self
            .tables()?
            .votes
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("vote {}", id)))?;
        vote.vote_type = vote_type;
        vote.updated_at = Utc::now();
        self.put(vote)?;
        Ok(())
    }

    async fn delete_vote(&mut self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.take::<Vote>(id)?.is_some())
    }

    async fn delete_votes_for_target(&mut self, target_id: Uuid, target_type: TargetType) -> Result<u64, StoreError> {
        let doomed: Vec<Uuid> = self
            .tables()?
            .votes
            .values()
            .filter(|v| v.target_id == target_id && v.target_type == target_type)
            .map(|v| v.id)
            .collect();
        for id in &doomed {
            self.take::<Vote>(*id)?;
        }
        Ok(doomed.len() as u64)
    }

    async fn find_collection(&mut self, author_id: Uuid, question_id: Uuid) -> Result<Option<Collection>, StoreError> {
        Ok(find_collection_in(self.tables()?, author_id, question_id).cloned())
    }

    async fn insert_collection(&mut self, collection: &Collection) -> Result<(), StoreError> {
        let tables = self.tables()?;
        if !tables.questions.contains_key(&collection.question_id) {
            return Err(StoreError::Integrity(format!(
                "collection {} references missing question {}",
                collection.id, collection.question_id
            )));
        }
        if find_collection_in(tables, collection.author_id, collection.question_id).is_some() {
            return Err(StoreError::Conflict(format!(
                "question {} already saved by {}",
                collection.question_id, collection.author_id
            )));
        }
        self.put(collection.clone())?;
        Ok(())
    }

    async fn delete_collection(&mut self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.take::<Collection>(id)?.is_some())
    }

    async fn delete_collections_for_question(&mut self, question_id: Uuid) -> Result<u64, StoreError> {
        let doomed: Vec<Uuid> = self
            .tables()?
            .collections
            .values()
            .filter(|c| c.question_id == question_id)
            .map(|c| c.id)
            .collect();
        for id in &doomed {
            self.take::<Collection>(*id)?;
        }
        Ok(doomed.len() as u64)
    }

    async fn increment(&mut self, counter: Counter, id: Uuid, delta: i64) -> Result<bool, StoreError> {
        let tables = self.tables()?;
        match counter {
            Counter::QuestionAnswers
            | Counter::QuestionUpvotes
            | Counter::QuestionDownvotes
            | Counter::QuestionViews => {
                let Some(mut q) = tables.questions.get(&id).cloned() else {
                    return Ok(false);
                };
                let field = match counter {
                    Counter::QuestionAnswers => &mut q.answers,
                    Counter::QuestionUpvotes => &mut q.upvotes,
                    Counter::QuestionDownvotes => &mut q.downvotes,
                    _ => &mut q.views,
                };
                bump(field, delta, counter, id)?;
                self.put(q)?;
            }
            Counter::AnswerUpvotes | Counter::AnswerDownvotes => {
                let Some(mut a) = tables.answers.get(&id).cloned() else {
                    return Ok(false);
                };
                let field = if counter == Counter::AnswerUpvotes { &mut a.upvotes } else { &mut a.downvotes };
                bump(field, delta, counter, id)?;
                self.put(a)?;
            }
            Counter::TagQuestions => {
                let Some(mut t) = tables.tags.get(&id).cloned() else {
                    return Ok(false);
                };
                bump(&mut t.questions, delta, counter, id)?;
                self.put(t)?;
            }
        }
        Ok(true)
    }

    async fn commit(mut self: Box<Self>) -> Result<(), StoreError> {
        self.undo.clear();
        self.guard.take();
        Ok(())
    }

    async fn abort(mut self: Box<Self>) -> Result<(), StoreError> {
        self.rollback();
        self.guard.take();
        Ok(())
    }
}

//! Store wrapper that fails the Nth transactional call, for atomicity tests.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use devflow_api::database::models::{
    Answer, AnswerView, Collection, Question, QuestionView, SavedQuestionView, Tag, TagLink,
    TargetType, User, Vote, VoteType,
};
use devflow_api::database::{Counter, PageSlice, Store, StoreError, StoreTx};
use devflow_api::filter::{AnswerSort, Pagination, SavedQuestionSort, TextSearch};

#[derive(Debug)]
pub struct Fault {
    countdown: AtomicI64,
    tripped: AtomicBool,
}

impl Fault {
    fn new() -> Self {
        Self { countdown: AtomicI64::new(-1), tripped: AtomicBool::new(false) }
    }

    /// Let `n` calls through, fail the next one (commit included).
    pub fn arm(&self, n: i64) {
        self.tripped.store(false, Ordering::SeqCst);
        self.countdown.store(n, Ordering::SeqCst);
    }

    pub fn disarm(&self) {
        self.countdown.store(-1, Ordering::SeqCst);
    }

    pub fn tripped(&self) -> bool {
        self.tripped.load(Ordering::SeqCst)
    }

    fn check(&self, op: &str) -> Result<(), StoreError> {
        let prev = self
            .countdown
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| if n >= 0 { Some(n - 1) } else { None });
        if prev == Ok(0) {
            self.tripped.store(true, Ordering::SeqCst);
            return Err(StoreError::QueryError(format!("injected fault in {}", op)));
        }
        Ok(())
    }
}

pub struct FaultyStore {
    inner: Arc<dyn Store>,
    pub fault: Arc<Fault>,
}

impl FaultyStore {
    pub fn new(inner: Arc<dyn Store>) -> Self {
        Self { inner, fault: Arc::new(Fault::new()) }
    }
}

#[async_trait]
impl Store for FaultyStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError> {
        let inner = self.inner.begin().await?;
        Ok(Box::new(FaultyTx { inner, fault: self.fault.clone() }))
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        self.inner.health_check().await
    }

    async fn question_view(&self, id: Uuid) -> Result<Option<QuestionView>, StoreError> {
        self.inner.question_view(id).await
    }

    async fn answers_page(
        &self,
        question_id: Uuid,
        sort: AnswerSort,
        page: Pagination,
    ) -> Result<PageSlice<AnswerView>, StoreError> {
        self.inner.answers_page(question_id, sort, page).await
    }

    async fn saved_questions_page(
        &self,
        user_id: Uuid,
        search: Option<&TextSearch>,
        sort: SavedQuestionSort,
        page: Pagination,
    ) -> Result<PageSlice<SavedQuestionView>, StoreError> {
        self.inner.saved_questions_page(user_id, search, sort, page).await
    }

    async fn find_vote(
        &self,
        author_id: Uuid,
        target_id: Uuid,
        target_type: TargetType,
    ) -> Result<Option<Vote>, StoreError> {
        self.inner.find_vote(author_id, target_id, target_type).await
    }

    async fn find_collection(&self, author_id: Uuid, question_id: Uuid) -> Result<Option<Collection>, StoreError> {
        self.inner.find_collection(author_id, question_id).await
    }
}

struct FaultyTx {
    inner: Box<dyn StoreTx>,
    fault: Arc<Fault>,
}

#[async_trait]
impl StoreTx for FaultyTx {
    async fn upsert_user(&mut self, user: &User) -> Result<User, StoreError> {
        self.fault.check("upsert_user")?;
        self.inner.upsert_user(user).await
    }

    async fn insert_user_if_absent(&mut self, user: &User) -> Result<bool, StoreError> {
        self.fault.check("insert_user_if_absent")?;
        self.inner.insert_user_if_absent(user).await
    }

    async fn find_question(&mut self, id: Uuid) -> Result<Option<Question>, StoreError> {
        self.fault.check("find_question")?;
        self.inner.find_question(id).await
    }

    async fn insert_question(&mut self, question: &Question) -> Result<(), StoreError> {
        self.fault.check("insert_question")?;
        self.inner.insert_question(question).await
    }

    async fn update_question_text(&mut self, id: Uuid, title: &str, content: &str) -> Result<(), StoreError> {
        self.fault.check("update_question_text")?;
        self.inner.update_question_text(id, title, content).await
    }

    async fn set_question_tags(&mut self, id: Uuid, tags: &[Uuid]) -> Result<(), StoreError> {
        self.fault.check("set_question_tags")?;
        self.inner.set_question_tags(id, tags).await
    }

    async fn delete_question(&mut self, id: Uuid) -> Result<bool, StoreError> {
        self.fault.check("delete_question")?;
        self.inner.delete_question(id).await
    }

    async fn upsert_tag_increment(&mut self, name: &str) -> Result<Tag, StoreError> {
        self.fault.check("upsert_tag_increment")?;
        self.inner.upsert_tag_increment(name).await
    }

    async fn find_tags(&mut self, ids: &[Uuid]) -> Result<Vec<Tag>, StoreError> {
        self.fault.check("find_tags")?;
        self.inner.find_tags(ids).await
    }

    async fn insert_tag_link(&mut self, link: &TagLink) -> Result<(), StoreError> {
        self.fault.check("insert_tag_link")?;
        self.inner.insert_tag_link(link).await
    }

    async fn delete_tag_links(&mut self, question_id: Uuid, tag_ids: &[Uuid]) -> Result<u64, StoreError> {
        self.fault.check("delete_tag_links")?;
        self.inner.delete_tag_links(question_id, tag_ids).await
    }

    async fn find_answer(&mut self, id: Uuid) -> Result<Option<Answer>, StoreError> {
        self.fault.check("find_answer")?;
        self.inner.find_answer(id).await
    }

    async fn answer_parent(&mut self, id: Uuid) -> Result<Option<Uuid>, StoreError> {
        self.fault.check("answer_parent")?;
        self.inner.answer_parent(id).await
    }

    async fn insert_answer(&mut self, answer: &Answer) -> Result<(), StoreError> {
        self.fault.check("insert_answer")?;
        self.inner.insert_answer(answer).await
    }

    async fn delete_answer(&mut self, id: Uuid) -> Result<bool, StoreError> {
        self.fault.check("delete_answer")?;
        self.inner.delete_answer(id).await
    }

    async fn answer_ids_for_question(&mut self, question_id: Uuid) -> Result<Vec<Uuid>, StoreError> {
        self.fault.check("answer_ids_for_question")?;
        self.inner.answer_ids_for_question(question_id).await
    }

    async fn delete_answers_for_question(&mut self, question_id: Uuid) -> Result<u64, StoreError> {
        self.fault.check("delete_answers_for_question")?;
        self.inner.delete_answers_for_question(question_id).await
    }

    async fn find_vote(
        &mut self,
        author_id: Uuid,
        target_id: Uuid,
        target_type: TargetType,
    ) -> Result<Option<Vote>, StoreError> {
        self.fault.check("find_vote")?;
        self.inner.find_vote(author_id, target_id, target_type).await
    }

    async fn insert_vote(&mut self, vote: &Vote) -> Result<(), StoreError> {
        self.fault.check("insert_vote")?;
        self.inner.insert_vote(vote).await
    }

    async fn update_vote_type(&mut self, id: Uuid, vote_type: VoteType) -> Result<(), StoreError> {
        self.fault.check("update_vote_type")?;
        self.inner.update_vote_type(id, vote_type).await
    }

    async fn delete_vote(&mut self, id: Uuid) -> Result<bool, StoreError> {
        self.fault.check("delete_vote")?;
        self.inner.delete_vote(id).await
    }

    async fn delete_votes_for_target(&mut self, target_id: Uuid, target_type: TargetType) -> Result<u64, StoreError> {
        self.fault.check("delete_votes_for_target")?;
        self.inner.delete_votes_for_target(target_id, target_type).await
    }

    async fn find_collection(&mut self, author_id: Uuid, question_id: Uuid) -> Result<Option<Collection>, StoreError> {
        self.fault.check("find_collection")?;
        self.inner.find_collection(author_id, question_id).await
    }

    async fn insert_collection(&mut self, collection: &Collection) -> Result<(), StoreError> {
        self.fault.check("insert_collection")?;
        self.inner.insert_collection(collection).await
    }

    async fn delete_collection(&mut self, id: Uuid) -> Result<bool, StoreError> {
        self.fault.check("delete_collection")?;
        self.inner.delete_collection(id).await
    }

    async fn delete_collections_for_question(&mut self, question_id: Uuid) -> Result<u64, StoreError> {
        self.fault.check("delete_collections_for_question")?;
        self.inner.delete_collections_for_question(question_id).await
    }

    async fn increment(&mut self, counter: Counter, id: Uuid, delta: i64) -> Result<bool, StoreError> {
        self.fault.check("increment")?;
        self.inner.increment(counter, id, delta).await
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        if let Err(e) = self.fault.check("commit") {
            self.inner.abort().await?;
            return Err(e);
        }
        self.inner.commit().await
    }

    async fn abort(self: Box<Self>) -> Result<(), StoreError> {
        self.inner.abort().await
    }
}

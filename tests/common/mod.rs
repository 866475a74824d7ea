#![allow(dead_code)]

pub mod faulty;
pub mod postgres;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::{json, Value};
use uuid::Uuid;

use devflow_api::actions::Actions;
use devflow_api::api::ActionResponse;
use devflow_api::auth::{generate_jwt, Claims, Session};
use devflow_api::database::models::{Answer, Question, VoteType};
use devflow_api::database::{MemoryStore, Snapshot, Store};
use devflow_api::AppState;

pub const LONG_ANSWER: &str = "This is a sufficiently detailed answer. It walks through the problem, \
    explains the cause and shows the fix step by step so that it clears the minimum length.";

/// Actions wired to a fresh in-memory store.
pub struct Harness {
    pub store: MemoryStore,
    pub actions: Actions,
}

impl Harness {
    pub fn new() -> Self {
        let store = MemoryStore::with_timeout(Duration::from_secs(2));
        let actions = Actions::new(Arc::new(store.clone()));
        Self { store, actions }
    }

    pub async fn snapshot(&self) -> Result<Snapshot> {
        Ok(self.store.snapshot().await?)
    }

    pub async fn ask(&self, who: &Session, title: &str, tags: &[&str]) -> Result<Question> {
        ask(&self.actions, who, title, tags).await
    }

    pub async fn answer(&self, who: &Session, question_id: Uuid) -> Result<Answer> {
        answer(&self.actions, who, question_id).await
    }

    pub async fn vote(&self, who: &Session, target_id: Uuid, target_type: &str, vote_type: VoteType) -> Result<Value> {
        vote(&self.actions, who, target_id, target_type, vote_type).await
    }
}

pub async fn ask(actions: &Actions, who: &Session, title: &str, tags: &[&str]) -> Result<Question> {
    let res = actions
        .create_question(Some(who), json!({ "title": title, "content": "Body of the question", "tags": tags }))
        .await;
    data(res)
}

pub async fn answer(actions: &Actions, who: &Session, question_id: Uuid) -> Result<Answer> {
    let res = actions
        .create_answer(Some(who), json!({ "questionId": question_id, "content": LONG_ANSWER }))
        .await;
    data(res)
}

pub async fn vote(
    actions: &Actions,
    who: &Session,
    target_id: Uuid,
    target_type: &str,
    vote_type: VoteType,
) -> Result<Value> {
    let res = actions
        .create_vote(
            Some(who),
            json!({ "targetId": target_id, "targetType": target_type, "voteType": vote_type.as_str() }),
        )
        .await;
    Ok(serde_json::to_value(data(res)?)?)
}

pub fn session(name: &str) -> Session {
    Session {
        user_id: Uuid::new_v4(),
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase()),
        image: None,
    }
}

/// Unwrap a successful response, or fail with its error message.
pub fn data<T>(res: ActionResponse<T>) -> Result<T> {
    if let Some(err) = res.error {
        anyhow::bail!("action failed ({:?}): {}", res.status, err.message);
    }
    res.data.context("successful response without data")
}

/// Error code of a failed response.
pub fn code<T>(res: &ActionResponse<T>) -> Option<&str> {
    res.error_code()
}

/// Every denormalized counter and tag list must agree with the rows it summarizes.
pub fn assert_consistent(s: &Snapshot) {
    for q in &s.questions {
        let answers = s.answers.iter().filter(|a| a.question_id == q.id).count() as i64;
        assert_eq!(q.answers, answers, "answer count of question {}", q.id);

        let (up, down) = vote_counts(s, q.id);
        assert_eq!((q.upvotes, q.downvotes), (up, down), "vote counts of question {}", q.id);

        let linked: HashSet<Uuid> = s.tag_links.iter().filter(|l| l.question_id == q.id).map(|l| l.tag_id).collect();
        let listed: HashSet<Uuid> = q.tags.iter().copied().collect();
        assert_eq!(linked, listed, "tag links of question {}", q.id);
        assert_eq!(q.tags.len(), listed.len(), "duplicate tag on question {}", q.id);
    }

    for a in &s.answers {
        let (up, down) = vote_counts(s, a.id);
        assert_eq!((a.upvotes, a.downvotes), (up, down), "vote counts of answer {}", a.id);
        assert!(s.question(a.question_id).is_some(), "orphan answer {}", a.id);
    }

    let mut per_tag: HashMap<Uuid, i64> = HashMap::new();
    for l in &s.tag_links {
        *per_tag.entry(l.tag_id).or_default() += 1;
    }
    for t in &s.tags {
        assert_eq!(t.questions, per_tag.get(&t.id).copied().unwrap_or(0), "usage count of tag {}", t.name);
    }

    let mut seen = HashSet::new();
    for v in &s.votes {
        assert!(seen.insert((v.author_id, v.target_id, v.target_type)), "duplicate vote {:?}", v);
    }
}

fn vote_counts(s: &Snapshot, target: Uuid) -> (i64, i64) {
    s.votes.iter().filter(|v| v.target_id == target).fold((0, 0), |(up, down), v| match v.vote_type {
        VoteType::Upvote => (up + 1, down),
        VoteType::Downvote => (up, down + 1),
    })
}

/// The router served on a free local port for the lifetime of the test runtime.
pub struct TestServer {
    pub base_url: String,
    pub client: reqwest::Client,
}

impl TestServer {
    pub async fn spawn(store: Arc<dyn Store>) -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
        let app = devflow_api::app(AppState::new(store));
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            base_url: format!("http://127.0.0.1:{}", port),
            client: reqwest::Client::new(),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

pub fn bearer(who: &Session) -> Result<String> {
    let claims = Claims::new(who.user_id, who.name.clone(), who.email.clone());
    Ok(format!("Bearer {}", generate_jwt(&claims)?))
}

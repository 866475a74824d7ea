mod common;

use std::time::Duration;

use anyhow::Result;
use serde_json::json;

use common::postgres::PgHarness;
use common::{assert_consistent, code, data, session, LONG_ANSWER};
use devflow_api::database::models::{TargetType, Vote, VoteType};
use devflow_api::database::{Counter, Store, StoreError};

// Returns early from the test when DATABASE_URL is unset.
macro_rules! pg_harness {
    () => {
        match PgHarness::connect().await? {
            Some(h) => h,
            None => return Ok(()),
        }
    };
}

#[tokio::test]
async fn migrations_are_idempotent_and_tags_fold_case() -> Result<()> {
    let h = pg_harness!();
    h.store.migrate().await?;

    let alice = session("Alice");
    h.ask(&alice, "First rust question", &["Rust"]).await?;
    h.ask(&alice, "Second rust question", &["rust", "SQL"]).await?;

    let snap = h.snapshot().await?;
    assert_eq!(snap.tags.len(), 2);
    assert_eq!(snap.tag("RUST").map(|t| t.questions), Some(2));
    assert_eq!(snap.tag("rust").map(|t| t.name.as_str()), Some("Rust"), "first spelling is kept");
    assert_consistent(&snap);
    h.cleanup().await
}

#[tokio::test]
async fn storage_errors_are_classified() -> Result<()> {
    let h = pg_harness!();
    let alice = session("Alice");
    let bob = session("Bob");
    let q = h.ask(&alice, "Classify my errors", &["errors"]).await?;
    h.vote(&bob, q.id, "question", VoteType::Upvote).await?;

    // counters never go negative
    let mut tx = h.store.begin().await?;
    let err = tx.increment(Counter::QuestionDownvotes, q.id, -1).await.err();
    assert!(matches!(err, Some(StoreError::Integrity(_))), "{:?}", err);
    tx.abort().await?;

    // one vote per user and target
    let mut tx = h.store.begin().await?;
    let err = tx
        .insert_vote(&Vote::new(bob.user_id, q.id, TargetType::Question, VoteType::Downvote))
        .await
        .err();
    assert!(matches!(err, Some(StoreError::Conflict(_))), "{:?}", err);
    tx.abort().await?;

    assert_consistent(&h.snapshot().await?);
    h.cleanup().await
}

#[tokio::test]
async fn saved_questions_search_escapes_wildcards() -> Result<()> {
    let h = pg_harness!();
    let alice = session("Alice");
    let bob = session("Bob");
    let carol = session("Carol");

    let percent = h.ask(&alice, "Is 100% test coverage worth it", &["testing"]).await?;
    let plain = h.ask(&alice, "1000 ways to panic", &["rust"]).await?;
    let voted = h.ask(&alice, "Borrow checker woes", &["rust"]).await?;
    h.vote(&carol, voted.id, "question", VoteType::Upvote).await?;

    for id in [percent.id, plain.id, voted.id] {
        data(h.actions.toggle_save_question(Some(&bob), json!({ "questionId": id })).await)?;
    }
    data(h.actions.toggle_save_question(Some(&carol), json!({ "questionId": plain.id })).await)?;

    let page = data(h.actions.get_saved_questions(Some(&bob), json!({ "query": "100%" })).await)?;
    let ids: Vec<_> = page.items.iter().map(|s| s.question.id).collect();
    assert_eq!(ids, vec![percent.id], "a literal % must not match 1000");

    let page = data(
        h.actions
            .get_saved_questions(Some(&bob), json!({ "filter": "mostvoted", "pageSize": 2 }))
            .await,
    )?;
    assert_eq!(page.items.len(), 2);
    assert!(page.is_next);
    assert_eq!(page.items[0].question.id, voted.id);
    assert_eq!(page.items[0].question.tags.len(), 1);

    let page = data(h.actions.get_saved_questions(Some(&carol), json!({})).await)?;
    let ids: Vec<_> = page.items.iter().map(|s| s.question.id).collect();
    assert_eq!(ids, vec![plain.id], "only the caller's own saves are listed");
    h.cleanup().await
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_writers_keep_counters_exact() -> Result<()> {
    let h = pg_harness!();
    let alice = session("Alice");
    let q = h.ask(&alice, "Contended question", &["race"]).await?;

    let question_id = q.id;
    let mut tasks = Vec::new();
    for i in 0..12 {
        let actions = h.actions.clone();
        let who = session(&format!("User{}", i));
        let vote_type = if i % 3 == 0 { "downvote" } else { "upvote" };
        tasks.push(tokio::spawn(async move {
            let vote = json!({ "targetId": question_id, "targetType": "question", "voteType": vote_type });
            data(actions.create_vote(Some(&who), vote.clone()).await)?;
            if i % 2 == 1 {
                data(actions.create_vote(Some(&who), vote).await)?;
            }
            data(
                actions
                    .create_answer(Some(&who), json!({ "questionId": question_id, "content": LONG_ANSWER }))
                    .await,
            )?;
            data(actions.toggle_save_question(Some(&who), json!({ "questionId": question_id })).await)?;
            anyhow::Ok(())
        }));
    }
    for task in futures::future::join_all(tasks).await {
        task??;
    }

    let snap = h.snapshot().await?;
    let question = snap.question(q.id).cloned().unwrap_or_else(|| panic!("question vanished"));
    let expected_up = (0..12).filter(|i| i % 2 == 0 && i % 3 != 0).count() as i64;
    let expected_down = (0..12).filter(|i| i % 2 == 0 && i % 3 == 0).count() as i64;
    assert_eq!((question.upvotes, question.downvotes), (expected_up, expected_down));
    assert_eq!(question.answers, 12);
    assert_eq!(snap.collections.len(), 12);
    assert_consistent(&snap);
    h.cleanup().await
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn shared_tags_in_any_order_never_deadlock() -> Result<()> {
    let h = pg_harness!();
    let alice = session("Alice");
    h.ask(&alice, "Seed the tag rows", &["x", "y", "z"]).await?;

    let mut created = Vec::new();
    for round in 0..10 {
        let mut tasks = Vec::new();
        for i in 0..6 {
            let actions = h.actions.clone();
            let who = session(&format!("Writer{}", i));
            let tags = if i % 2 == 0 { ["x", "y", "z"] } else { ["z", "y", "x"] };
            tasks.push(tokio::spawn(async move {
                let input = json!({ "title": format!("Round {} writer {}", round, i), "content": "Body", "tags": tags });
                let res = actions.create_question(Some(&who), input).await;
                data(res).map(|q| (who, q))
            }));
        }
        for task in futures::future::join_all(tasks).await {
            created.push(task??);
        }
    }

    // retag concurrently: half drop y and z for w, half the other way round
    let mut tasks = Vec::new();
    for (i, (who, q)) in created.into_iter().enumerate() {
        let actions = h.actions.clone();
        let tags = if i % 2 == 0 { ["w", "x"] } else { ["x", "w"] };
        tasks.push(tokio::spawn(async move {
            let input = json!({ "questionId": q.id, "title": q.title, "content": q.content, "tags": tags });
            data(actions.edit_question(Some(&who), input).await)
        }));
    }
    for task in futures::future::join_all(tasks).await {
        task??;
    }

    let snap = h.snapshot().await?;
    assert_eq!(snap.tag("x").map(|t| t.questions), Some(61));
    assert_eq!(snap.tag("w").map(|t| t.questions), Some(60));
    assert_eq!(snap.tag("y").map(|t| t.questions), Some(1));
    assert_consistent(&snap);
    h.cleanup().await
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn deleting_a_question_sweeps_votes_cast_while_it_waits() -> Result<()> {
    let h = pg_harness!();
    let alice = session("Alice");
    let bob = session("Bob");
    let q = h.ask(&alice, "Question about to go", &["cascade"]).await?;
    let a = h.answer(&alice, q.id).await?;
    data(h.actions.ensure_user(Some(&bob), json!({})).await)?;

    // Bob's vote holds the answer row and is not committed yet
    let mut vote_tx = h.store.begin().await?;
    assert!(vote_tx.find_answer(a.id).await?.is_some());
    vote_tx
        .insert_vote(&Vote::new(bob.user_id, a.id, TargetType::Answer, VoteType::Upvote))
        .await?;
    assert!(vote_tx.increment(Counter::AnswerUpvotes, a.id, 1).await?);

    let actions = h.actions.clone();
    let owner = alice.clone();
    let question_id = q.id;
    let delete = tokio::spawn(async move {
        actions.delete_question(Some(&owner), json!({ "questionId": question_id })).await
    });
    tokio::time::sleep(Duration::from_millis(300)).await;
    vote_tx.commit().await?;

    data(delete.await?)?;
    let snap = h.snapshot().await?;
    assert!(snap.answer(a.id).is_none());
    assert!(snap.votes.iter().all(|v| v.target_id != a.id), "vote left on a deleted answer");
    assert_consistent(&snap);
    h.cleanup().await
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn answer_and_question_deletes_race_cleanly() -> Result<()> {
    let h = pg_harness!();
    let alice = session("Alice");

    for round in 0..8 {
        let q = h.ask(&alice, &format!("Short lived question {}", round), &["race"]).await?;
        let a = h.answer(&alice, q.id).await?;

        let (by_question, by_answer) = tokio::join!(
            h.actions.delete_question(Some(&alice), json!({ "questionId": q.id })),
            h.actions.delete_answer(Some(&alice), json!({ "answerId": a.id })),
        );
        data(by_question)?;
        if let Some(code) = code(&by_answer) {
            assert_eq!(code, "NOT_FOUND", "a racing answer delete either wins or finds nothing");
        }
    }

    let snap = h.snapshot().await?;
    assert!(snap.questions.is_empty());
    assert!(snap.answers.is_empty());
    assert_consistent(&snap);
    h.cleanup().await
}

use serde::Deserialize;
use uuid::Uuid;

use super::{Checker, Validate};
use crate::database::models::{tag_key, TargetType, VoteType};
use crate::error::ActionError;
use crate::filter::{AnswerSort, Pagination, SavedQuestionSort, TextSearch};

pub const TITLE_MIN: usize = 5;
pub const TITLE_MAX: usize = 100;
pub const TAG_MAX_LEN: usize = 30;
pub const MAX_TAGS: usize = 3;
pub const ANSWER_MIN: usize = 100;

const TARGET_TYPES: &[&str] = &["question", "answer"];
const VOTE_TYPES: &[&str] = &["upvote", "downvote"];

/// Trim tags, drop case-insensitive duplicates (first spelling wins), enforce 1..=3.
fn check_tags(c: &mut Checker, tags: Option<Vec<String>>) -> Vec<String> {
    let mut seen = Vec::new();
    let mut out = Vec::new();
    for tag in tags.unwrap_or_default() {
        let tag = tag.trim().to_string();
        if tag.is_empty() {
            c.fail("tags", "Tag is required");
            continue;
        }
        if tag.chars().count() > TAG_MAX_LEN {
            c.fail("tags", format!("Tag cannot exceed {} characters", TAG_MAX_LEN));
            continue;
        }
        let key = tag_key(&tag);
        if !seen.contains(&key) {
            seen.push(key);
            out.push(tag);
        }
    }

    if out.is_empty() {
        c.fail("tags", "At least one tag is required");
    } else if out.len() > MAX_TAGS {
        c.fail("tags", format!("Cannot add more than {} tags", MAX_TAGS));
    }
    out
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AskQuestionInput {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AskQuestion {
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
}

impl Validate for AskQuestionInput {
    type Output = AskQuestion;

    fn validate(self) -> Result<AskQuestion, ActionError> {
        let mut c = Checker::new();
        let title = c.text("title", "Title", self.title, TITLE_MIN, Some(TITLE_MAX));
        let content = c.text("content", "Body", self.content, 1, None);
        let tags = check_tags(&mut c, self.tags);
        c.finish()?;
        Ok(AskQuestion { title, content, tags })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditQuestionInput {
    pub question_id: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EditQuestion {
    pub question_id: Uuid,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
}

impl Validate for EditQuestionInput {
    type Output = EditQuestion;

    fn validate(self) -> Result<EditQuestion, ActionError> {
        let mut c = Checker::new();
        let question_id = c.uuid("questionId", self.question_id);
        let title = c.text("title", "Title", self.title, TITLE_MIN, Some(TITLE_MAX));
        let content = c.text("content", "Body", self.content, 1, None);
        let tags = check_tags(&mut c, self.tags);
        c.finish()?;
        Ok(EditQuestion { question_id, title, content, tags })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateAnswerInput {
    pub question_id: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateAnswer {
    pub question_id: Uuid,
    pub content: String,
}

impl Validate for CreateAnswerInput {
    type Output = CreateAnswer;

    fn validate(self) -> Result<CreateAnswer, ActionError> {
        let mut c = Checker::new();
        let question_id = c.uuid("questionId", self.question_id);
        let content = c.text("content", "Answer", self.content, ANSWER_MIN, None);
        c.finish()?;
        Ok(CreateAnswer { question_id, content })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnswerRefInput {
    pub answer_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnswerRef {
    pub answer_id: Uuid,
}

impl Validate for AnswerRefInput {
    type Output = AnswerRef;

    fn validate(self) -> Result<AnswerRef, ActionError> {
        let mut c = Checker::new();
        let answer_id = c.uuid("answerId", self.answer_id);
        c.finish()?;
        Ok(AnswerRef { answer_id })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QuestionRefInput {
    pub question_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuestionRef {
    pub question_id: Uuid,
}

impl Validate for QuestionRefInput {
    type Output = QuestionRef;

    fn validate(self) -> Result<QuestionRef, ActionError> {
        let mut c = Checker::new();
        let question_id = c.uuid("questionId", self.question_id);
        c.finish()?;
        Ok(QuestionRef { question_id })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateVoteInput {
    pub target_id: Option<String>,
    pub target_type: Option<String>,
    pub vote_type: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CreateVote {
    pub target_id: Uuid,
    pub target_type: TargetType,
    pub vote_type: VoteType,
}

impl Validate for CreateVoteInput {
    type Output = CreateVote;

    fn validate(self) -> Result<CreateVote, ActionError> {
        let mut c = Checker::new();
        let target_id = c.uuid("targetId", self.target_id);
        let target_type = c.one_of("targetType", self.target_type, TARGET_TYPES);
        let vote_type = c.one_of("voteType", self.vote_type, VOTE_TYPES);
        c.finish()?;
        match (target_type, vote_type) {
            (Some(target_type), Some(vote_type)) => Ok(CreateVote { target_id, target_type, vote_type }),
            _ => Err(ActionError::invalid_field("body", "Invalid vote")),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VoteTargetInput {
    pub target_id: Option<String>,
    pub target_type: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoteTarget {
    pub target_id: Uuid,
    pub target_type: TargetType,
}

impl Validate for VoteTargetInput {
    type Output = VoteTarget;

    fn validate(self) -> Result<VoteTarget, ActionError> {
        let mut c = Checker::new();
        let target_id = c.uuid("targetId", self.target_id);
        let target_type = c.one_of("targetType", self.target_type, TARGET_TYPES);
        c.finish()?;
        target_type
            .map(|target_type| VoteTarget { target_id, target_type })
            .ok_or_else(|| ActionError::invalid_field("targetType", "targetType is required"))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GetAnswersInput {
    pub question_id: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub filter: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GetAnswers {
    pub question_id: Uuid,
    pub pagination: Pagination,
    pub sort: AnswerSort,
}

impl Validate for GetAnswersInput {
    type Output = GetAnswers;

    fn validate(self) -> Result<GetAnswers, ActionError> {
        let mut c = Checker::new();
        let question_id = c.uuid("questionId", self.question_id);
        let page = c.positive("page", self.page);
        let page_size = c.positive("pageSize", self.page_size);
        c.finish()?;
        Ok(GetAnswers {
            question_id,
            pagination: Pagination::new(page, page_size),
            sort: AnswerSort::parse(self.filter.as_deref()),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PaginatedSearchInput {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub query: Option<String>,
    pub filter: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SavedQuestionsQuery {
    pub pagination: Pagination,
    pub search: Option<TextSearch>,
    pub sort: SavedQuestionSort,
}

impl Validate for PaginatedSearchInput {
    type Output = SavedQuestionsQuery;

    fn validate(self) -> Result<SavedQuestionsQuery, ActionError> {
        let mut c = Checker::new();
        let page = c.positive("page", self.page);
        let page_size = c.positive("pageSize", self.page_size);
        c.finish()?;
        Ok(SavedQuestionsQuery {
            pagination: Pagination::new(page, page_size),
            search: TextSearch::new(self.query.as_deref()),
            sort: SavedQuestionSort::parse(self.filter.as_deref()),
        })
    }
}

/// Optional profile overrides sent alongside EnsureUser. Anything missing
/// falls back to what the identity provider put in the session.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserProfileInput {
    pub name: Option<String>,
    pub username: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserProfile {
    pub name: Option<String>,
    pub username: Option<String>,
    pub image: Option<String>,
}

impl Validate for UserProfileInput {
    type Output = UserProfile;

    fn validate(self) -> Result<UserProfile, ActionError> {
        let mut c = Checker::new();
        let name = self.name.map(|n| c.text("name", "Name", Some(n), 1, Some(50)));
        let username = self.username.map(|u| {
            let u = c.text("username", "Username", Some(u), 3, Some(30));
            if !u.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-') {
                c.fail("username", "Username may only contain letters, numbers, '-' and '_'");
            }
            u
        });
        let image = self.image.map(|i| i.trim().to_string()).filter(|i| !i.is_empty());
        if let Some(image) = &image {
            if url::Url::parse(image).is_err() {
                c.fail("image", "Image must be a valid URL");
            }
        }
        c.finish()?;
        Ok(UserProfile { name, username, image })
    }
}

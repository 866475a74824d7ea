pub mod answer;
pub mod collection;
pub mod question;
pub mod tag;
pub mod user;
pub mod vote;

pub use answer::{Answer, AnswerView};
pub use collection::Collection;
pub use question::{Question, QuestionView, SavedQuestionView};
pub use tag::{tag_key, Tag, TagLink, TagSummary};
pub use user::{AuthorSummary, User};
pub use vote::{TargetType, Vote, VoteType};

// handlers/public/mod.rs - endpoints that never need a session
pub mod health;
pub mod questions;

pub use health::{health, root};
pub use questions::{answers_get, question_get};

// handlers/protected/mod.rs - endpoints that act on behalf of the session user
pub mod answers;
pub mod collections;
pub mod questions;
pub mod users;
pub mod votes;

use axum::Extension;

use crate::auth::Session;

/// The session placed in request extensions by `session_middleware`, if any.
pub(crate) fn session(ext: &Option<Extension<Session>>) -> Option<&Session> {
    ext.as_ref().map(|Extension(session)| session)
}

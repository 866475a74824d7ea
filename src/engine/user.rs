use chrono::Utc;

use crate::auth::Session;
use crate::database::models::User;
use crate::database::StoreTx;
use crate::error::ActionError;
use crate::validation::UserProfile;

/// Username used when the caller did not pick one.
fn default_username(session: &Session) -> String {
    let local = session.email.split('@').next().unwrap_or_default();
    let source = if local.is_empty() { session.name.as_str() } else { local };
    let base = source
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect::<String>()
        .to_lowercase();
    if base.len() >= 3 {
        base
    } else {
        format!("user-{}", &session.user_id.simple().to_string()[..8])
    }
}

pub(crate) fn profile_user(session: &Session, profile: UserProfile) -> User {
    let now = Utc::now();
    User {
        id: session.user_id,
        name: profile.name.unwrap_or_else(|| session.name.clone()),
        username: profile.username.unwrap_or_else(|| default_username(session)),
        email: session.email.clone(),
        image: profile.image.or_else(|| session.image.clone()),
        created_at: now,
        updated_at: now,
    }
}

pub(crate) async fn ensure(tx: &mut dyn StoreTx, session: &Session, profile: UserProfile) -> Result<User, ActionError> {
    Ok(tx.upsert_user(&profile_user(session, profile)).await?)
}

/// Make sure the acting user has a row before it authors anything.
pub(crate) async fn register_author(tx: &mut dyn StoreTx, session: &Session) -> Result<(), ActionError> {
    if tx.insert_user_if_absent(&profile_user(session, UserProfile::default())).await? {
        tracing::info!("Registered user {} on first write", session.user_id);
    }
    Ok(())
}

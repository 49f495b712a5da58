use chrono::Duration;
use tubely_api::state::AppState;
use uuid::Uuid;

/// A valid bearer token for `user_id`, signed with the app's key.
pub fn token_for(state: &AppState, user_id: Uuid) -> String {
    state
        .jwt
        .issue(user_id, Duration::hours(1))
        .expect("Failed to sign test token")
}

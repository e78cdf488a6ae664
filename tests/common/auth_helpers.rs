//! Authentication test helpers

use eduflex::backend::auth::sessions::create_token;
use uuid::Uuid;

/// Test learner with a valid bearer token
pub struct TestUser {
    pub id: Uuid,
    pub token: String,
}

impl TestUser {
    pub fn new() -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            token: generate_test_token(id),
        }
    }
}

/// Generate a test JWT token
pub fn generate_test_token(user_id: Uuid) -> String {
    create_token(user_id, None).expect("Failed to generate test token")
}

/// Create authorization header value
pub fn auth_header(token: &str) -> String {
    format!("Bearer {}", token)
}

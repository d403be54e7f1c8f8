use uuid::Uuid;

/// Identity of the user a flow acts on behalf of.
///
/// Every flow takes this explicitly instead of reading a "current user" from
/// ambient state, so callers (HTTP handlers, tests) decide whose factors and
/// codes are touched.
#[derive(Debug, Clone)]
pub struct UserContext {
    pub user_id: Uuid,
    pub email: String,
}

impl UserContext {
    pub fn new(user_id: Uuid, email: impl Into<String>) -> Self {
        Self {
            user_id,
            email: email.into(),
        }
    }
}

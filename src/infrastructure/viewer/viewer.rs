use crate::models::UserId;

/// Identity of the caller for one request.
#[derive(Debug, Clone)]
pub struct ViewerContext {
    pub user_id: UserId,
    pub request_id: String,
}

impl ViewerContext {
    pub fn new(user_id: UserId, request_id: String) -> Self {
        ViewerContext { user_id, request_id }
    }
}

use crate::models::UserId;

/// The single owner check. Nothing else in the crate compares ids against the owner.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProtectedAccounts {
    owner: Option<UserId>,
}

impl ProtectedAccounts {
    pub fn new(owner: Option<UserId>) -> Self {
        Self { owner }
    }

    pub fn is_protected(&self, user_id: UserId) -> bool {
        self.owner == Some(user_id)
    }

    pub fn owner(&self) -> Option<UserId> {
        self.owner
    }
}

// SocialGraphService - follower/following edges between users
// Both directions of an edge are written in one transaction; notifications go out after commit

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::infrastructure::collections::{associations, users};
use crate::infrastructure::database::EntityStore;
use crate::infrastructure::notifications::{Notification, NotificationSink, NOTIFICATION_EVENT};
use crate::models::{AssocType, UserId, UserSummary};
use crate::services::protected::ProtectedAccounts;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FollowOutcome {
    Followed,
    Unfollowed,
}

impl FollowOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            FollowOutcome::Followed => "followed",
            FollowOutcome::Unfollowed => "unfollowed",
        }
    }
}

#[derive(Clone)]
pub struct SocialGraphService {
    store: EntityStore,
    notifier: Arc<dyn NotificationSink>,
    protected: ProtectedAccounts,
}

impl SocialGraphService {
    pub fn new(
        store: EntityStore,
        notifier: Arc<dyn NotificationSink>,
        protected: ProtectedAccounts,
    ) -> Self {
        Self {
            store,
            notifier,
            protected,
        }
    }

    /// Adds `target` to `actor.following` and `actor` to `target.followers`.
    /// Following someone already followed changes nothing and sends nothing.
    pub async fn follow(&self, actor: UserId, target: UserId) -> AppResult<()> {
        reject_self(actor, target)?;

        let mut tx = self.store.begin().await?;
        let actor_summary = require_users(tx.conn(), actor, target).await?;

        let added = associations::add(tx.conn(), actor, AssocType::Following, target).await?;
        associations::add(tx.conn(), target, AssocType::Followers, actor).await?;
        tx.commit().await?;

        if added {
            info!("User {} followed {}", actor, target);
            self.notifier.push(
                target,
                NOTIFICATION_EVENT,
                Notification::followed(actor_summary).to_payload(),
            );
        } else {
            debug!("User {} already follows {}", actor, target);
        }
        Ok(())
    }

    pub async fn unfollow(&self, actor: UserId, target: UserId) -> AppResult<()> {
        reject_self(actor, target)?;
        if self.protected.is_protected(target) {
            return Err(AppError::Forbidden("This account cannot be unfollowed".to_string()));
        }

        let mut tx = self.store.begin().await?;
        require_users(tx.conn(), actor, target).await?;

        associations::remove(tx.conn(), actor, AssocType::Following, target).await?;
        associations::remove(tx.conn(), target, AssocType::Followers, actor).await?;
        tx.commit().await?;

        info!("User {} unfollowed {}", actor, target);
        Ok(())
    }

    /// Follows when not following yet, unfollows otherwise.
    pub async fn toggle_follow(&self, actor: UserId, target: UserId) -> AppResult<FollowOutcome> {
        reject_self(actor, target)?;

        let following = {
            let mut conn = self.store.acquire().await?;
            associations::exists(&mut conn, actor, AssocType::Following, target).await?
        };

        if following {
            self.unfollow(actor, target).await?;
            Ok(FollowOutcome::Unfollowed)
        } else {
            self.follow(actor, target).await?;
            Ok(FollowOutcome::Followed)
        }
    }

    pub async fn list_followers(&self, user: UserId) -> AppResult<Vec<UserSummary>> {
        self.list_edges(user, AssocType::Followers).await
    }

    pub async fn list_following(&self, user: UserId) -> AppResult<Vec<UserSummary>> {
        self.list_edges(user, AssocType::Following).await
    }

    async fn list_edges(&self, user: UserId, atype: AssocType) -> AppResult<Vec<UserSummary>> {
        let mut conn = self.store.acquire().await?;
        if !users::exists(&mut conn, user).await? {
            return Err(AppError::NotFound("User not found".to_string()));
        }
        let ids = associations::list(&mut conn, user, atype).await?;
        users::summaries(&mut conn, &ids).await
    }
}

fn reject_self(actor: UserId, target: UserId) -> AppResult<()> {
    if actor == target {
        return Err(AppError::Validation("You can't follow/unfollow yourself".to_string()));
    }
    Ok(())
}

/// Both ends must exist. Returns the actor's summary for the notification payload.
async fn require_users(
    conn: &mut sqlx::SqliteConnection,
    actor: UserId,
    target: UserId,
) -> AppResult<UserSummary> {
    let actor_summary = users::summary(conn, actor)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    if !users::exists(conn, target).await? {
        return Err(AppError::NotFound("User not found".to_string()));
    }
    Ok(actor_summary)
}

// AccountRemovalTransaction - cascading delete of an account and everything hanging off it
//
// Started -> ValidatingAuthorization -> CollectingDependents -> ApplyingCleanup -> Committed
// Any failure lands in Aborted. Validation and cleanup share one store transaction, so an
// abort leaves the store exactly as it was.

use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};
use crate::infrastructure::collections::{associations, comments, conversations, messages, posts, users};
use crate::infrastructure::database::{EntityStore, StoreTransaction};
use crate::models::{AssocType, CommentId, ConversationId, MessageId, ObjectId, PostId, UserId};
use crate::services::protected::ProtectedAccounts;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RemovalState {
    Started,
    ValidatingAuthorization,
    CollectingDependents,
    ApplyingCleanup,
    Committed,
    Aborted,
}

/// Documents that depend on the target and go with it.
#[derive(Debug, Default)]
struct Dependents {
    posts: Vec<PostId>,
    comments: Vec<CommentId>,
    conversations: Vec<ConversationId>,
    messages: Vec<MessageId>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovalReport {
    pub user_id: UserId,
    pub posts_deleted: u64,
    pub comments_deleted: u64,
    pub conversations_deleted: u64,
    pub messages_deleted: u64,
    pub bookmarks_cleared: u64,
}

/// What happened to one removal attempt.
#[derive(Debug)]
pub struct RemovalOutcome {
    pub trail: Vec<RemovalState>,
    pub result: AppResult<RemovalReport>,
}

impl RemovalOutcome {
    pub fn final_state(&self) -> RemovalState {
        self.trail.last().copied().unwrap_or(RemovalState::Started)
    }

    pub fn into_result(self) -> AppResult<RemovalReport> {
        self.result
    }
}

#[derive(Clone)]
pub struct AccountRemovalTransaction {
    store: EntityStore,
    protected: ProtectedAccounts,
}

impl AccountRemovalTransaction {
    pub fn new(store: EntityStore, protected: ProtectedAccounts) -> Self {
        Self { store, protected }
    }

    pub async fn remove_user(&self, caller: UserId, target: UserId) -> AppResult<RemovalReport> {
        self.execute(caller, target).await.into_result()
    }

    /// Runs the state machine to completion and reports every state it passed through.
    pub async fn execute(&self, caller: UserId, target: UserId) -> RemovalOutcome {
        let mut trail = vec![RemovalState::Started];
        let result = self.run(caller, target, &mut trail).await;

        match &result {
            Ok(report) => {
                trail.push(RemovalState::Committed);
                info!(
                    "Removed user {}: {} posts, {} comments, {} conversations, {} messages",
                    target,
                    report.posts_deleted,
                    report.comments_deleted,
                    report.conversations_deleted,
                    report.messages_deleted
                );
            }
            Err(e) => {
                let reached = trail.last().copied().unwrap_or(RemovalState::Started);
                trail.push(RemovalState::Aborted);
                warn!("Removal of user {} aborted in {:?}: {}", target, reached, e);
            }
        }

        RemovalOutcome { trail, result }
    }

    async fn run(
        &self,
        caller: UserId,
        target: UserId,
        trail: &mut Vec<RemovalState>,
    ) -> AppResult<RemovalReport> {
        if !self.protected.is_protected(caller) {
            return Err(AppError::Forbidden("Only the owner can remove accounts".to_string()));
        }

        advance(trail, RemovalState::ValidatingAuthorization, target);
        if self.protected.is_protected(target) {
            return Err(AppError::Forbidden("This account cannot be removed".to_string()));
        }
        let mut tx = self.store.begin().await?;
        if !users::exists(tx.conn(), target).await? {
            return Err(AppError::NotFound("User not found".to_string()));
        }

        advance(trail, RemovalState::CollectingDependents, target);
        let dependents = match collect_dependents(&mut tx, target).await {
            Ok(found) => found,
            Err(e) => return Err(abort(tx, e).await),
        };
        debug!(
            "User {} has {} posts, {} comments, {} conversations, {} messages",
            target,
            dependents.posts.len(),
            dependents.comments.len(),
            dependents.conversations.len(),
            dependents.messages.len()
        );

        advance(trail, RemovalState::ApplyingCleanup, target);
        let report = match apply_cleanup(&mut tx, target, &dependents).await {
            Ok(report) => report,
            Err(e) => return Err(abort(tx, e).await),
        };
        tx.commit()
            .await
            .map_err(|e| AppError::TransactionFailure(e.to_string()))?;

        Ok(report)
    }
}

fn advance(trail: &mut Vec<RemovalState>, next: RemovalState, target: UserId) {
    debug!("Removal of user {} entering {:?}", target, next);
    trail.push(next);
}

/// Rolls back and turns the cause into a TransactionFailure.
async fn abort(tx: StoreTransaction, cause: AppError) -> AppError {
    if let Err(e) = tx.rollback().await {
        warn!("Rollback reported an error: {}", e);
    }
    AppError::TransactionFailure(cause.to_string())
}

async fn collect_dependents(tx: &mut StoreTransaction, target: UserId) -> AppResult<Dependents> {
    let mut post_ids: BTreeSet<PostId> = posts::ids_by_author(tx.conn(), target).await?.into_iter().collect();
    post_ids.extend(associations::list(tx.conn(), target, AssocType::Posts).await?);
    let post_ids: Vec<PostId> = post_ids.into_iter().collect();

    let comment_ids = comments::ids_by_author_or_posts(tx.conn(), target, &post_ids).await?;
    let conversation_ids = conversations::ids_with_participant(tx.conn(), target).await?;
    let message_ids = messages::ids_by_party(tx.conn(), target).await?;

    Ok(Dependents {
        posts: post_ids,
        comments: comment_ids,
        conversations: conversation_ids,
        messages: message_ids,
    })
}

async fn apply_cleanup(
    tx: &mut StoreTransaction,
    target: UserId,
    dependents: &Dependents,
) -> AppResult<RemovalReport> {
    let posts_deleted = posts::delete_many(tx.conn(), &dependents.posts).await?;
    let comments_deleted = comments::delete_many(tx.conn(), &dependents.comments).await?;

    // Covers the owner's lists along with everyone else's.
    associations::remove_all_everywhere(tx.conn(), AssocType::Followers, &[target]).await?;
    associations::remove_all_everywhere(tx.conn(), AssocType::Following, &[target]).await?;
    associations::remove_all_everywhere(tx.conn(), AssocType::Likes, &[target]).await?;

    let conversations_deleted = conversations::delete_many(tx.conn(), &dependents.conversations).await?;
    let messages_deleted = messages::delete_many(tx.conn(), &dependents.messages).await?;

    let bookmarks_cleared = if dependents.posts.is_empty() {
        0
    } else {
        associations::remove_all_everywhere(tx.conn(), AssocType::Bookmarks, &dependents.posts).await?
    };

    if !users::delete(tx.conn(), target).await? {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    let mut removed: Vec<ObjectId> = Vec::with_capacity(
        1 + dependents.posts.len()
            + dependents.comments.len()
            + dependents.conversations.len()
            + dependents.messages.len(),
    );
    removed.push(target);
    removed.extend(&dependents.posts);
    removed.extend(&dependents.comments);
    removed.extend(&dependents.conversations);
    removed.extend(&dependents.messages);
    associations::delete_touching(tx.conn(), &removed).await?;

    Ok(RemovalReport {
        user_id: target,
        posts_deleted,
        comments_deleted,
        conversations_deleted,
        messages_deleted,
        bookmarks_cleared,
    })
}

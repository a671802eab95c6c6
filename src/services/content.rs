// ContentService - posts, comments, likes and bookmarks
// Back-references (user.posts, post.comments, user.bookmarks, post.likes) are association rows
// written in the same transaction that checks the documents they point at

use serde::Serialize;
use sqlx::SqliteConnection;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::infrastructure::collections::{associations, comments, posts, users};
use crate::infrastructure::database::EntityStore;
use crate::infrastructure::notifications::{Notification, NotificationSink, NOTIFICATION_EVENT};
use crate::models::{AssocType, Comment, CommentView, Post, PostId, PostView, UserId, UserSummary};
use crate::services::moderation::contains_blocked;
use crate::services::protected::ProtectedAccounts;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BookmarkOutcome {
    Saved,
    Unsaved,
}

impl BookmarkOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookmarkOutcome::Saved => "saved",
            BookmarkOutcome::Unsaved => "unsaved",
        }
    }
}

#[derive(Clone)]
pub struct ContentService {
    store: EntityStore,
    notifier: Arc<dyn NotificationSink>,
    protected: ProtectedAccounts,
    blocked_terms: Arc<Vec<String>>,
}

impl ContentService {
    pub fn new(
        store: EntityStore,
        notifier: Arc<dyn NotificationSink>,
        protected: ProtectedAccounts,
        blocked_terms: Vec<String>,
    ) -> Self {
        Self {
            store,
            notifier,
            protected,
            blocked_terms: Arc::new(blocked_terms),
        }
    }

    /// `image_url` points at an already hosted image.
    pub async fn create_post(&self, author: UserId, caption: &str, image_url: &str) -> AppResult<PostView> {
        if image_url.trim().is_empty() {
            return Err(AppError::Validation("Image required".to_string()));
        }

        let id = self.store.next_id();
        let mut tx = self.store.begin().await?;
        if !users::exists(tx.conn(), author).await? {
            return Err(AppError::NotFound("User not found".to_string()));
        }
        posts::insert(tx.conn(), id, author, image_url, caption).await?;
        associations::add(tx.conn(), author, AssocType::Posts, id).await?;
        tx.commit().await?;
        info!("User {} created post {}", author, id);

        let mut conn = self.store.acquire().await?;
        let post = posts::get(&mut conn, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;
        build_post_views(&mut conn, vec![post])
            .await?
            .pop()
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    pub async fn like(&self, user: UserId, post: PostId) -> AppResult<()> {
        let mut tx = self.store.begin().await?;
        let author = require_post(tx.conn(), post).await?;
        let actor = require_user(tx.conn(), user).await?;
        associations::add(tx.conn(), post, AssocType::Likes, user).await?;
        tx.commit().await?;

        if author != user {
            self.notifier.push(
                author,
                NOTIFICATION_EVENT,
                Notification::liked(actor, post).to_payload(),
            );
        }
        Ok(())
    }

    pub async fn unlike(&self, user: UserId, post: PostId) -> AppResult<()> {
        let mut tx = self.store.begin().await?;
        require_post(tx.conn(), post).await?;
        associations::remove(tx.conn(), post, AssocType::Likes, user).await?;
        tx.commit().await
    }

    pub async fn add_comment(&self, user: UserId, post: PostId, text: &str) -> AppResult<CommentView> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::Validation("Text is required".to_string()));
        }
        if contains_blocked(text, self.blocked_terms.as_slice()) {
            return Err(AppError::Validation(
                "Comment contains inappropriate content".to_string(),
            ));
        }

        let id = self.store.next_id();
        let mut tx = self.store.begin().await?;
        let author = require_post(tx.conn(), post).await?;
        let actor = require_user(tx.conn(), user).await?;
        let comment = comments::insert(tx.conn(), id, text, user, post).await?;
        associations::add(tx.conn(), post, AssocType::Comments, id).await?;
        tx.commit().await?;

        if author != user {
            self.notifier.push(
                author,
                NOTIFICATION_EVENT,
                Notification::commented(actor.clone(), post).to_payload(),
            );
        }
        Ok(comment_view(comment, actor))
    }

    /// Removes the post, its comments, and every list entry pointing at either,
    /// including other users' bookmarks.
    pub async fn delete_post(&self, actor: UserId, post: PostId) -> AppResult<()> {
        let mut tx = self.store.begin().await?;
        let author = require_post(tx.conn(), post).await?;
        if author != actor && !self.protected.is_protected(actor) {
            return Err(AppError::Forbidden("Unauthorized".to_string()));
        }

        let comment_ids = comments::ids_by_post(tx.conn(), post).await?;
        comments::delete_many(tx.conn(), &comment_ids).await?;
        posts::delete_many(tx.conn(), &[post]).await?;

        let mut touched = comment_ids;
        touched.push(post);
        associations::delete_touching(tx.conn(), &touched).await?;
        tx.commit().await?;

        info!("User {} deleted post {} ({} comments)", actor, post, touched.len() - 1);
        Ok(())
    }

    /// Saves when absent from the user's bookmarks, unsaves otherwise.
    pub async fn bookmark_toggle(&self, user: UserId, post: PostId) -> AppResult<BookmarkOutcome> {
        let mut tx = self.store.begin().await?;
        require_post(tx.conn(), post).await?;
        require_user(tx.conn(), user).await?;

        let outcome = if associations::remove(tx.conn(), user, AssocType::Bookmarks, post).await? {
            BookmarkOutcome::Unsaved
        } else {
            associations::add(tx.conn(), user, AssocType::Bookmarks, post).await?;
            BookmarkOutcome::Saved
        };
        tx.commit().await?;
        Ok(outcome)
    }

    /// Newest first: the viewer's own posts, every public account's, and those of
    /// private accounts the viewer follows.
    pub async fn feed(&self, viewer: UserId) -> AppResult<Vec<PostView>> {
        let mut conn = self.store.acquire().await?;
        let found = posts::visible_to(&mut conn, viewer).await?;
        build_post_views(&mut conn, found).await
    }

    pub async fn posts_by_author(&self, author: UserId) -> AppResult<Vec<PostView>> {
        let mut conn = self.store.acquire().await?;
        let found = posts::by_author(&mut conn, author).await?;
        build_post_views(&mut conn, found).await
    }

    pub async fn comments_of_post(&self, post: PostId) -> AppResult<Vec<CommentView>> {
        let mut conn = self.store.acquire().await?;
        require_post(&mut conn, post).await?;
        let found = comments::by_post(&mut conn, post).await?;
        resolve_comments(&mut conn, found).await
    }
}

/// Returns the post's author, or NotFound.
async fn require_post(conn: &mut SqliteConnection, post: PostId) -> AppResult<UserId> {
    posts::author_of(conn, post)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))
}

/// A session can outlive its account, so writes re-check the actor.
async fn require_user(conn: &mut SqliteConnection, user: UserId) -> AppResult<UserSummary> {
    users::summary(conn, user)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

fn comment_view(comment: Comment, author: UserSummary) -> CommentView {
    CommentView {
        id: comment.id,
        text: comment.text,
        author,
        post: comment.post,
        created_at: comment.created_at,
    }
}

async fn resolve_comments(conn: &mut SqliteConnection, found: Vec<Comment>) -> AppResult<Vec<CommentView>> {
    let author_ids: Vec<UserId> = found
        .iter()
        .map(|c| c.author)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let authors = summaries_by_id(conn, &author_ids).await?;

    Ok(found
        .into_iter()
        .filter_map(|c| {
            let author = authors.get(&c.author)?.clone();
            Some(comment_view(c, author))
        })
        .collect())
}

async fn summaries_by_id(
    conn: &mut SqliteConnection,
    ids: &[UserId],
) -> AppResult<HashMap<UserId, UserSummary>> {
    Ok(users::summaries(conn, ids)
        .await?
        .into_iter()
        .map(|s| (s.id, s))
        .collect())
}

/// Resolves authors and comments for a batch of posts, keeping their order.
pub(crate) async fn build_post_views(conn: &mut SqliteConnection, found: Vec<Post>) -> AppResult<Vec<PostView>> {
    let comment_ids: Vec<_> = found.iter().flat_map(|p| p.comments.iter().copied()).collect();
    let all_comments = comments::by_ids(conn, &comment_ids).await?;

    let mut people: BTreeSet<UserId> = found.iter().map(|p| p.author).collect();
    people.extend(all_comments.iter().map(|c| c.author));
    let people: Vec<UserId> = people.into_iter().collect();
    let summaries = summaries_by_id(conn, &people).await?;

    let mut comments_by_post: HashMap<PostId, Vec<CommentView>> = HashMap::new();
    for comment in all_comments {
        if let Some(author) = summaries.get(&comment.author) {
            comments_by_post
                .entry(comment.post)
                .or_default()
                .push(comment_view(comment, author.clone()));
        }
    }

    Ok(found
        .into_iter()
        .filter_map(|post| {
            let author = summaries.get(&post.author)?.clone();
            Some(PostView {
                id: post.id,
                author,
                image: post.image,
                caption: post.caption,
                likes: post.likes,
                comments: comments_by_post.remove(&post.id).unwrap_or_default(),
                created_at: post.created_at,
            })
        })
        .collect())
}

// AccountService - registration, sessions and profile reads/edits

use once_cell::sync::Lazy;
use regex::Regex;
use sqlx::SqliteConnection;
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::infrastructure::collections::users::{self, NewUser, ProfileUpdate};
use crate::infrastructure::collections::{associations, posts};
use crate::infrastructure::database::EntityStore;
use crate::infrastructure::security::{hash_password, verify_password, SessionKeys};
use crate::models::{AssocType, Gender, ProfileView, User, UserId, UserSummary};
use crate::services::content::build_post_views;
use crate::services::moderation::contains_blocked;
use crate::services::protected::ProtectedAccounts;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex")
});

const SUGGESTION_LIMIT: i64 = 10;
const SEARCH_LIMIT: i64 = 20;

/// Raw profile edit as submitted; gender is free text and only `male`/`female` are kept.
#[derive(Debug, Default, Clone)]
pub struct ProfileEdit {
    pub bio: Option<String>,
    pub gender: Option<String>,
    pub is_private: Option<bool>,
    pub profile_picture: Option<String>,
}

#[derive(Clone)]
pub struct AccountService {
    store: EntityStore,
    sessions: SessionKeys,
    protected: ProtectedAccounts,
    reserved_terms: Vec<String>,
}

impl AccountService {
    pub fn new(
        store: EntityStore,
        sessions: SessionKeys,
        protected: ProtectedAccounts,
        reserved_terms: Vec<String>,
    ) -> Self {
        Self {
            store,
            sessions,
            protected,
            reserved_terms,
        }
    }

    /// Creates the account and, when the owner account exists, follows it.
    pub async fn register(&self, username: &str, email: &str, password: &str) -> AppResult<UserSummary> {
        let username = username.trim();
        let email = email.trim();
        if username.is_empty() || email.is_empty() || password.is_empty() {
            return Err(AppError::Unauthorized("Something is missing, please check!".to_string()));
        }
        if !EMAIL_RE.is_match(email) {
            return Err(AppError::Validation("Invalid email address".to_string()));
        }
        if contains_blocked(username, self.reserved_terms.as_slice())
            || contains_blocked(email, self.reserved_terms.as_slice())
        {
            return Err(AppError::Unauthorized(
                "Username or email contains a reserved term".to_string(),
            ));
        }

        {
            let mut conn = self.store.acquire().await?;
            if users::email_taken(&mut conn, email).await? {
                return Err(AppError::Conflict("Try different email".to_string()));
            }
            if users::username_taken(&mut conn, username).await? {
                return Err(AppError::Conflict("Username already taken".to_string()));
            }
        }

        let password_hash = hash_password(password)?;
        let id = self.store.next_id();

        let mut tx = self.store.begin().await?;
        let inserted = users::insert(
            tx.conn(),
            NewUser {
                id,
                username,
                email,
                password_hash: &password_hash,
            },
        )
        .await;
        if let Err(e) = inserted {
            return Err(conflict_or(e));
        }

        if let Some(owner) = self.protected.owner() {
            if users::exists(tx.conn(), owner).await? {
                associations::add(tx.conn(), id, AssocType::Following, owner).await?;
                associations::add(tx.conn(), owner, AssocType::Followers, id).await?;
            } else {
                warn!("Owner account {} does not exist, skipping auto-follow", owner);
            }
        }
        tx.commit().await?;

        info!("Registered user {} ({})", id, username);
        Ok(UserSummary {
            id,
            username: username.to_string(),
            profile_picture: String::new(),
            bio: String::new(),
        })
    }

    /// Checks credentials and issues a session token.
    pub async fn login(&self, email: &str, password: &str) -> AppResult<(ProfileView, String)> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(AppError::Unauthorized("Something is missing, please check!".to_string()));
        }

        let mut conn = self.store.acquire().await?;
        let user = users::find_by_email(&mut conn, email)
            .await?
            .ok_or_else(invalid_credentials)?;
        if !verify_password(password, &user.password_hash)? {
            return Err(invalid_credentials());
        }

        let token = self.sessions.issue(user.id)?;
        let profile = profile_view(&mut conn, user).await?;
        info!("User {} logged in", profile.id);
        Ok((profile, token))
    }

    pub async fn profile(&self, user: UserId) -> AppResult<ProfileView> {
        let mut conn = self.store.acquire().await?;
        let found = users::get(&mut conn, user)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        profile_view(&mut conn, found).await
    }

    pub async fn edit_profile(&self, user: UserId, edit: ProfileEdit) -> AppResult<ProfileView> {
        let update = ProfileUpdate {
            bio: edit.bio,
            gender: edit.gender.as_deref().and_then(Gender::parse),
            is_private: edit.is_private,
            profile_picture: edit.profile_picture,
        };

        let mut tx = self.store.begin().await?;
        if !users::update_profile(tx.conn(), user, &update).await? {
            return Err(AppError::NotFound("User not found".to_string()));
        }
        tx.commit().await?;

        self.profile(user).await
    }

    pub async fn suggested_users(&self, viewer: UserId) -> AppResult<Vec<UserSummary>> {
        let mut conn = self.store.acquire().await?;
        let suggested = users::others(&mut conn, viewer, SUGGESTION_LIMIT).await?;
        if suggested.is_empty() {
            return Err(AppError::NotFound("Currently do not have any users".to_string()));
        }
        Ok(suggested)
    }

    pub async fn search_users(&self, viewer: UserId, query: &str) -> AppResult<Vec<UserSummary>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::Validation("Search query is required".to_string()));
        }
        let mut conn = self.store.acquire().await?;
        users::search(&mut conn, query, viewer, SEARCH_LIMIT).await
    }
}

fn invalid_credentials() -> AppError {
    AppError::Unauthorized("Incorrect email or password".to_string())
}

/// A unique-index violation means another registration won the race.
fn conflict_or(err: AppError) -> AppError {
    match err {
        AppError::DatabaseError(msg) if msg.contains("UNIQUE constraint failed") => {
            AppError::Conflict("Username or email already taken".to_string())
        }
        other => other,
    }
}

async fn profile_view(conn: &mut SqliteConnection, user: User) -> AppResult<ProfileView> {
    let own_posts = posts::by_ids(conn, &user.posts).await?;
    let own_posts = build_post_views(conn, own_posts).await?;
    let saved = posts::by_ids(conn, &user.bookmarks).await?;
    let saved = build_post_views(conn, saved).await?;

    Ok(ProfileView {
        id: user.id,
        username: user.username,
        email: user.email,
        bio: user.bio,
        profile_picture: user.profile_picture,
        gender: user.gender,
        is_private: user.is_private,
        followers: user.followers,
        following: user.following,
        posts: own_posts,
        bookmarks: saved,
    })
}

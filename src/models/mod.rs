// Document models - Users, posts, comments, conversations and messages
// Lists of ids on a document are stored as association rows, see AssocType

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

pub type ObjectId = i64;
pub type UserId = ObjectId;
pub type PostId = ObjectId;
pub type CommentId = ObjectId;
pub type ConversationId = ObjectId;
pub type MessageId = ObjectId;

/// Millisecond timestamps as stored in the object tables.
pub type Timestamp = i64;

pub fn current_time_millis() -> Timestamp {
    Utc::now().timestamp_millis()
}

pub fn to_datetime(millis: Timestamp) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis).single().unwrap_or_default()
}

/// Denormalized id lists. `id1` owns the list, `id2` is the referenced document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssocType {
    /// user -> post authored
    Posts,
    /// user -> post saved
    Bookmarks,
    /// user -> user following them
    Followers,
    /// user -> user they follow
    Following,
    /// post -> user
    Likes,
    /// post -> comment
    Comments,
    /// conversation -> user
    Participants,
    /// conversation -> message
    Messages,
}

impl AssocType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssocType::Posts => "posts",
            AssocType::Bookmarks => "bookmarks",
            AssocType::Followers => "followers",
            AssocType::Following => "following",
            AssocType::Likes => "likes",
            AssocType::Comments => "comments",
            AssocType::Participants => "participants",
            AssocType::Messages => "messages",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    /// Only the two stored values are accepted; anything else is ignored by profile edits.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "male" => Some(Gender::Male),
            "female" => Some(Gender::Female),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub bio: String,
    pub profile_picture: String,
    pub gender: Option<Gender>,
    pub is_private: bool,
    pub created_at: DateTime<Utc>,
    pub posts: Vec<PostId>,
    pub bookmarks: Vec<PostId>,
    pub followers: Vec<UserId>,
    pub following: Vec<UserId>,
}

impl User {
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            username: self.username.clone(),
            profile_picture: self.profile_picture.clone(),
            bio: self.bio.clone(),
        }
    }
}

/// The projection used in follower lists and as the author of posts and comments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: UserId,
    pub username: String,
    pub profile_picture: String,
    pub bio: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub author: UserId,
    pub image: String,
    pub caption: String,
    pub likes: Vec<UserId>,
    pub comments: Vec<CommentId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub text: String,
    pub author: UserId,
    pub post: PostId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    pub id: CommentId,
    pub text: String,
    pub author: UserSummary,
    pub post: PostId,
    pub created_at: DateTime<Utc>,
}

/// A post with its author and comments resolved.
#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    pub id: PostId,
    pub author: UserSummary,
    pub image: String,
    pub caption: String,
    pub likes: Vec<UserId>,
    pub comments: Vec<CommentView>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileView {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub bio: String,
    pub profile_picture: String,
    pub gender: Option<Gender>,
    pub is_private: bool,
    pub followers: Vec<UserId>,
    pub following: Vec<UserId>,
    pub posts: Vec<PostView>,
    pub bookmarks: Vec<PostView>,
}

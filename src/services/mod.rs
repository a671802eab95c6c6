// Business services, one per area. Each holds a cloned EntityStore handle.

pub mod account_removal;
pub mod accounts;
pub mod content;
pub mod messaging;
pub mod moderation;
pub mod protected;
pub mod social_graph;

pub use account_removal::{AccountRemovalTransaction, RemovalOutcome, RemovalReport, RemovalState};
pub use accounts::{AccountService, ProfileEdit};
pub use content::{BookmarkOutcome, ContentService};
pub use messaging::MessagingService;
pub use protected::ProtectedAccounts;
pub use social_graph::{FollowOutcome, SocialGraphService};

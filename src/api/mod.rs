// HTTP surface under /api/v1
// Handlers stay thin: extract, call a service, shape the `{success, message, ...}` body

pub mod message;
pub mod post;
pub mod user;
pub mod ws;

use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

use crate::app_state::AppState;
use crate::infrastructure::middleware::viewer_context_middleware;

pub fn create_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/user/register", post(user::register_handler))
        .route("/user/login", post(user::login_handler))
        .route("/user/logout", get(user::logout_handler))
        .route("/user/{id}/followers", get(user::followers_handler))
        .route("/user/{id}/following", get(user::following_handler));

    let authenticated = Router::new()
        .route("/user/{id}/profile", get(user::profile_handler))
        .route("/user/profile/edit", post(user::edit_profile_handler))
        .route("/user/suggested", get(user::suggested_handler))
        .route("/user/search", get(user::search_handler))
        .route("/user/followorunfollow/{id}", post(user::follow_or_unfollow_handler))
        .route("/user/{id}", delete(user::remove_user_handler))
        .route("/post/addpost", post(post::add_post_handler))
        .route("/post/all", get(post::feed_handler))
        .route("/post/userpost/all", get(post::user_posts_handler))
        .route("/post/{id}/like", get(post::like_handler))
        .route("/post/{id}/dislike", get(post::dislike_handler))
        .route("/post/{id}/comment", post(post::add_comment_handler))
        .route("/post/{id}/comment/all", post(post::comments_handler))
        .route("/post/delete/{id}", delete(post::delete_post_handler))
        .route("/post/{id}/bookmark", get(post::bookmark_handler))
        .route("/message/send/{id}", post(message::send_handler))
        .route("/message/all/{id}", get(message::conversation_handler))
        .route("/ws", get(ws::ws_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            viewer_context_middleware::<AppState>,
        ));

    Router::new()
        .nest("/api/v1", public.merge(authenticated))
        .with_state(state)
}

/// Credentialed CORS for an explicit origin list, so browsers send the session cookie.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) if origin != "*" => Some(value),
            _ => {
                warn!("Ignoring CORS origin {:?}", origin);
                None
            }
        })
        .collect();
    info!("CORS configured with {} allowed origins", allowed.len());

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::ACCEPT, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(Duration::from_secs(86400))
}

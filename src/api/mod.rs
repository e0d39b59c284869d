use axum::Router;
use serde::{Deserialize, Deserializer};

pub mod advisory;
pub mod album;
pub mod album_image;
pub mod announcement;
pub mod category;
pub mod club;
pub mod comment;
pub mod community;
pub mod community_event;
pub mod event;
pub mod invitation;
pub mod lab;
pub mod membership;
pub mod request;

pub fn app() -> Router {
    Router::new()
        .nest("/category", category::app())
        .nest("/community", community::app())
        .nest("/club", club::app())
        .nest("/event", event::app())
        .nest("/community-event", community_event::app())
        .nest("/lab", lab::app())
        .nest("/request", request::app())
        .nest("/invitation", invitation::app())
        .nest("/membership", membership::app())
        .nest("/advisory", advisory::app())
        .nest("/announcement", announcement::app())
        .nest("/album", album::app())
        .nest("/album-image", album_image::app())
        .nest("/comment", comment::app())
}

/// Keeps an explicit `null` apart from an absent field: absent is `None`,
/// `null` is `Some(None)`. Use together with `#[serde(default)]`.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

use crate::{
    access,
    auth::MaybeAuth,
    error::{AppError, AppResult},
    hierarchy,
    models::{Comment, NewComment},
    schema::*,
    DbPool,
};
use axum::{
    extract::{Path, Query},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde::Deserialize;

#[derive(Deserialize)]
struct CommentQuery {
    event: Option<i32>,
}

async fn list(
    Extension(pool): Extension<DbPool>,
    MaybeAuth(viewer): MaybeAuth,
    Query(q): Query<CommentQuery>,
) -> AppResult<Json<Vec<Comment>>> {
    let conn = &mut pool.get().await?;

    let mut query = comments::table
        .inner_join(communities::table)
        .select(comments::all_columns)
        .into_boxed();
    if viewer.public_only() {
        query = query.filter(communities::is_publicly_visible.eq(true));
    }
    if let Some(event) = q.event {
        query = query.filter(comments::event_id.eq(event));
    }

    Ok(Json(
        query
            .order(comments::created_at)
            .load::<Comment>(conn)
            .await?,
    ))
}

async fn info(
    Extension(pool): Extension<DbPool>,
    MaybeAuth(viewer): MaybeAuth,
    Path(id): Path<i32>,
) -> AppResult<Json<Comment>> {
    let conn = &mut pool.get().await?;

    let comment = comments::table
        .find(id)
        .select(Comment::as_select())
        .first(conn)
        .await
        .optional()?
        .ok_or_else(|| AppError::not_found("comment"))?;
    access::visible_community(conn, viewer, comment.event_id).await?;

    Ok(Json(comment))
}

#[derive(Deserialize)]
struct NewCommentBody {
    text: String,
    written_by: String,
    event: i32,
}

/// Anyone may comment under an event they can see; anonymous callers only
/// see public ones.
async fn create(
    Extension(pool): Extension<DbPool>,
    MaybeAuth(viewer): MaybeAuth,
    Json(req): Json<NewCommentBody>,
) -> AppResult<(StatusCode, Json<Comment>)> {
    let conn = &mut pool.get().await?;

    let event = access::visible_community(conn, viewer, req.event).await?;
    let placement = access::placement_of(conn, &event).await?;
    hierarchy::check_comment_target(&placement)?;

    let comment = diesel::insert_into(comments::table)
        .values(NewComment {
            text: req.text,
            written_by: req.written_by,
            event_id: event.id,
            created_by: viewer.user_id(),
        })
        .get_result::<Comment>(conn)
        .await?;
    tracing::info!(
        comment_id = comment.id,
        event_id = event.id,
        anonymous = !viewer.is_authenticated(),
        "comment written"
    );

    Ok((StatusCode::CREATED, Json(comment)))
}

pub fn app() -> Router {
    Router::new()
        .route("/", get(list).post(create))
        .route("/:id", get(info))
}

use super::album::find_album;
use crate::{
    access,
    auth::{ExtractAuth, MaybeAuth},
    error::{AppError, AppResult},
    media,
    models::AlbumImage,
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
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use serde::Deserialize;

/// Marks the owning album as edited by `user_id`; `updated_at` follows
/// through the table trigger.
async fn touch_album(conn: &mut AsyncPgConnection, album_id: i32, user_id: i32) -> AppResult<()> {
    diesel::update(albums::table.find(album_id))
        .set(albums::updated_by.eq(Some(user_id)))
        .execute(conn)
        .await?;
    Ok(())
}

#[derive(Deserialize)]
struct AlbumImageQuery {
    album: Option<i32>,
}

async fn list(
    Extension(pool): Extension<DbPool>,
    MaybeAuth(viewer): MaybeAuth,
    Query(q): Query<AlbumImageQuery>,
) -> AppResult<Json<Vec<AlbumImage>>> {
    let conn = &mut pool.get().await?;

    let mut query = album_images::table
        .inner_join(albums::table.inner_join(communities::table))
        .select(album_images::all_columns)
        .into_boxed();
    if viewer.public_only() {
        query = query.filter(communities::is_publicly_visible.eq(true));
    }
    if let Some(album) = q.album {
        query = query.filter(album_images::album_id.eq(album));
    }

    Ok(Json(
        query
            .order(album_images::id)
            .load::<AlbumImage>(conn)
            .await?,
    ))
}

async fn info(
    Extension(pool): Extension<DbPool>,
    MaybeAuth(viewer): MaybeAuth,
    Path(id): Path<i32>,
) -> AppResult<Json<AlbumImage>> {
    let conn = &mut pool.get().await?;

    let image = album_images::table
        .find(id)
        .select(AlbumImage::as_select())
        .first(conn)
        .await
        .optional()?
        .ok_or_else(|| AppError::not_found("album image"))?;
    let album = find_album(conn, image.album_id).await?;
    access::visible_community(conn, viewer, album.community_id).await?;

    Ok(Json(image))
}

#[derive(Deserialize)]
struct NewAlbumImageBody {
    album: i32,
    file_name: String,
}

async fn create(
    Extension(pool): Extension<DbPool>,
    ExtractAuth(user_id): ExtractAuth,
    Json(req): Json<NewAlbumImageBody>,
) -> AppResult<(StatusCode, Json<AlbumImage>)> {
    let conn = &mut pool.get().await?;

    let album = find_album(conn, req.album).await?;
    access::require_staff(conn, user_id, album.community_id).await?;
    let album_id = album.id;

    let image = conn
        .transaction::<_, AppError, _>(|conn| {
            Box::pin(async move {
                // the stored path is keyed by the row id, so it is set after insert
                let id = diesel::insert_into(album_images::table)
                    .values((
                        album_images::album_id.eq(album_id),
                        album_images::image.eq(""),
                    ))
                    .returning(album_images::id)
                    .get_result::<i32>(conn)
                    .await?;
                let path = media::album_image_path(album_id, id, &req.file_name)?;

                let image = diesel::update(album_images::table.find(id))
                    .set(album_images::image.eq(path))
                    .get_result::<AlbumImage>(conn)
                    .await?;
                touch_album(conn, album_id, user_id).await?;
                Ok(image)
            })
        })
        .await?;
    tracing::info!(image_id = image.id, album_id, user_id, "album image added");

    Ok((StatusCode::CREATED, Json(image)))
}

/// Removing an image that is already gone still succeeds.
async fn remove(
    Extension(pool): Extension<DbPool>,
    ExtractAuth(user_id): ExtractAuth,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    let conn = &mut pool.get().await?;

    let image = album_images::table
        .find(id)
        .select(AlbumImage::as_select())
        .first(conn)
        .await
        .optional()?;
    let Some(image) = image else {
        return Ok(StatusCode::NO_CONTENT);
    };
    let album = find_album(conn, image.album_id).await?;
    access::require_staff(conn, user_id, album.community_id).await?;
    let album_id = album.id;

    conn.transaction::<_, AppError, _>(|conn| {
        Box::pin(async move {
            diesel::delete(album_images::table.find(id))
                .execute(conn)
                .await?;
            touch_album(conn, album_id, user_id).await
        })
    })
    .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub fn app() -> Router {
    Router::new()
        .route("/", get(list).post(create))
        .route("/:id", get(info).delete(remove))
}

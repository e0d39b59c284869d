use super::nullable;
use crate::{
    access,
    auth::{ExtractAuth, MaybeAuth},
    error::{AppError, AppResult},
    hierarchy,
    models::{Album, NewAlbum},
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
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::Deserialize;

pub(crate) async fn find_album(conn: &mut AsyncPgConnection, id: i32) -> AppResult<Album> {
    albums::table
        .find(id)
        .select(Album::as_select())
        .first(conn)
        .await
        .optional()?
        .ok_or_else(|| AppError::not_found("album"))
}

/// Resolves both ends of an album once and applies the placement rules.
async fn check_placement(
    conn: &mut AsyncPgConnection,
    community_id: i32,
    community_event_id: Option<i32>,
) -> AppResult<()> {
    let owner = access::placement(conn, community_id).await?;
    let linked = match community_event_id {
        Some(id) => Some(access::placement(conn, id).await?),
        None => None,
    };
    hierarchy::check_album(&owner, linked.as_ref())?;
    Ok(())
}

#[derive(Deserialize)]
struct AlbumQuery {
    community: Option<i32>,
    community_event: Option<i32>,
}

async fn list(
    Extension(pool): Extension<DbPool>,
    MaybeAuth(viewer): MaybeAuth,
    Query(q): Query<AlbumQuery>,
) -> AppResult<Json<Vec<Album>>> {
    let conn = &mut pool.get().await?;

    let mut query = albums::table
        .inner_join(communities::table)
        .select(albums::all_columns)
        .into_boxed();
    if viewer.public_only() {
        query = query.filter(communities::is_publicly_visible.eq(true));
    }
    if let Some(community) = q.community {
        query = query.filter(albums::community_id.eq(community));
    }
    if let Some(community_event) = q.community_event {
        query = query.filter(albums::community_event_id.eq(community_event));
    }

    Ok(Json(query.order(albums::id).load::<Album>(conn).await?))
}

async fn info(
    Extension(pool): Extension<DbPool>,
    MaybeAuth(viewer): MaybeAuth,
    Path(id): Path<i32>,
) -> AppResult<Json<Album>> {
    let conn = &mut pool.get().await?;

    let album = find_album(conn, id).await?;
    access::visible_community(conn, viewer, album.community_id).await?;

    Ok(Json(album))
}

#[derive(Deserialize)]
struct NewAlbumBody {
    name: String,
    community: i32,
    community_event: Option<i32>,
}

async fn create(
    Extension(pool): Extension<DbPool>,
    ExtractAuth(user_id): ExtractAuth,
    Json(req): Json<NewAlbumBody>,
) -> AppResult<(StatusCode, Json<Album>)> {
    let conn = &mut pool.get().await?;

    access::find_community(conn, req.community).await?;
    access::require_staff(conn, user_id, req.community).await?;
    check_placement(conn, req.community, req.community_event).await?;

    let album = diesel::insert_into(albums::table)
        .values(NewAlbum {
            name: req.name,
            community_id: req.community,
            community_event_id: req.community_event,
            created_by: Some(user_id),
            updated_by: Some(user_id),
        })
        .get_result::<Album>(conn)
        .await?;

    Ok((StatusCode::CREATED, Json(album)))
}

#[derive(Deserialize)]
struct AlbumPatch {
    name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    community_event: Option<Option<i32>>,
}

async fn update(
    Extension(pool): Extension<DbPool>,
    ExtractAuth(user_id): ExtractAuth,
    Path(id): Path<i32>,
    Json(req): Json<AlbumPatch>,
) -> AppResult<Json<Album>> {
    let conn = &mut pool.get().await?;

    let mut album = find_album(conn, id).await?;
    access::require_staff(conn, user_id, album.community_id).await?;

    if let Some(name) = req.name {
        album.name = name;
    }
    if let Some(community_event) = req.community_event {
        album.community_event_id = community_event;
    }
    check_placement(conn, album.community_id, album.community_event_id).await?;

    let album = diesel::update(albums::table.find(id))
        .set((
            albums::name.eq(&album.name),
            albums::community_event_id.eq(album.community_event_id),
            albums::updated_by.eq(Some(user_id)),
        ))
        .get_result::<Album>(conn)
        .await?;

    Ok(Json(album))
}

async fn delete(
    Extension(pool): Extension<DbPool>,
    ExtractAuth(user_id): ExtractAuth,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    let conn = &mut pool.get().await?;

    let album = find_album(conn, id).await?;
    access::require_staff(conn, user_id, album.community_id).await?;

    diesel::delete(albums::table.find(id)).execute(conn).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub fn app() -> Router {
    Router::new()
        .route("/", get(list).post(create))
        .route("/:id", get(info).patch(update).put(update).delete(delete))
}

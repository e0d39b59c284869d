use super::nullable;
use crate::{
    access,
    auth::{ExtractAuth, MaybeAuth},
    error::{AppError, AppResult},
    models::{Announcement, NewAnnouncement},
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

async fn find_announcement(conn: &mut AsyncPgConnection, id: i32) -> AppResult<Announcement> {
    announcements::table
        .find(id)
        .select(Announcement::as_select())
        .first(conn)
        .await
        .optional()?
        .ok_or_else(|| AppError::not_found("announcement"))
}

#[derive(Deserialize)]
struct AnnouncementQuery {
    community: Option<i32>,
}

async fn list(
    Extension(pool): Extension<DbPool>,
    MaybeAuth(viewer): MaybeAuth,
    Query(q): Query<AnnouncementQuery>,
) -> AppResult<Json<Vec<Announcement>>> {
    let conn = &mut pool.get().await?;

    let mut query = announcements::table
        .inner_join(communities::table)
        .select(announcements::all_columns)
        .into_boxed();
    if viewer.public_only() {
        query = query.filter(communities::is_publicly_visible.eq(true));
    }
    if let Some(community) = q.community {
        query = query.filter(announcements::community_id.eq(community));
    }

    Ok(Json(
        query
            .order(announcements::created_at.desc())
            .load::<Announcement>(conn)
            .await?,
    ))
}

async fn info(
    Extension(pool): Extension<DbPool>,
    MaybeAuth(viewer): MaybeAuth,
    Path(id): Path<i32>,
) -> AppResult<Json<Announcement>> {
    let conn = &mut pool.get().await?;

    let announcement = find_announcement(conn, id).await?;
    access::visible_community(conn, viewer, announcement.community_id).await?;

    Ok(Json(announcement))
}

#[derive(Deserialize)]
struct NewAnnouncementBody {
    text: String,
    image: Option<String>,
    community: i32,
}

async fn create(
    Extension(pool): Extension<DbPool>,
    ExtractAuth(user_id): ExtractAuth,
    Json(req): Json<NewAnnouncementBody>,
) -> AppResult<(StatusCode, Json<Announcement>)> {
    let conn = &mut pool.get().await?;

    access::find_community(conn, req.community).await?;
    access::require_staff(conn, user_id, req.community).await?;

    let announcement = diesel::insert_into(announcements::table)
        .values(NewAnnouncement {
            text: req.text,
            image: req.image,
            community_id: req.community,
            created_by: Some(user_id),
            updated_by: Some(user_id),
        })
        .get_result::<Announcement>(conn)
        .await?;

    Ok((StatusCode::CREATED, Json(announcement)))
}

#[derive(Deserialize)]
struct AnnouncementPatch {
    text: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    image: Option<Option<String>>,
}

#[derive(AsChangeset)]
#[diesel(table_name = announcements)]
struct AnnouncementChanges {
    text: Option<String>,
    image: Option<Option<String>>,
    updated_by: Option<i32>,
}

async fn update(
    Extension(pool): Extension<DbPool>,
    ExtractAuth(user_id): ExtractAuth,
    Path(id): Path<i32>,
    Json(req): Json<AnnouncementPatch>,
) -> AppResult<Json<Announcement>> {
    let conn = &mut pool.get().await?;

    let announcement = find_announcement(conn, id).await?;
    access::require_staff(conn, user_id, announcement.community_id).await?;

    let announcement = diesel::update(announcements::table.find(id))
        .set(AnnouncementChanges {
            text: req.text,
            image: req.image,
            updated_by: Some(user_id),
        })
        .get_result::<Announcement>(conn)
        .await?;

    Ok(Json(announcement))
}

async fn delete(
    Extension(pool): Extension<DbPool>,
    ExtractAuth(user_id): ExtractAuth,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    let conn = &mut pool.get().await?;

    let announcement = find_announcement(conn, id).await?;
    access::require_staff(conn, user_id, announcement.community_id).await?;

    diesel::delete(announcements::table.find(id))
        .execute(conn)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub fn app() -> Router {
    Router::new()
        .route("/", get(list).post(create))
        .route("/:id", get(info).patch(update).put(update).delete(delete))
}

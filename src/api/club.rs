use super::{
    community::{self, CommunityFields, CommunityPatch},
    nullable,
};
use crate::{
    access,
    auth::{ExtractAuth, MaybeAuth},
    error::{AppError, AppResult},
    hierarchy,
    models::{Club, Community, CommunityKind, OperationStatus},
    schema::*,
    validation::ValidationErrors,
    DbPool,
};
use axum::{
    extract::{Path, Query},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use chrono::NaiveDate;
use diesel::prelude::*;
use diesel_async::{AsyncConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
struct ClubResponse {
    #[serde(flatten)]
    community: Community,
    #[serde(flatten)]
    club: Club,
}

#[derive(Deserialize)]
struct ClubQuery {
    club_type: Option<i32>,
    status: Option<OperationStatus>,
    is_official: Option<bool>,
}

async fn list(
    Extension(pool): Extension<DbPool>,
    MaybeAuth(viewer): MaybeAuth,
    Query(q): Query<ClubQuery>,
) -> AppResult<Json<Vec<ClubResponse>>> {
    let conn = &mut pool.get().await?;

    let mut query = communities::table
        .inner_join(clubs::table)
        .select((communities::all_columns, clubs::all_columns))
        .into_boxed();
    if viewer.public_only() {
        query = query.filter(communities::is_publicly_visible.eq(true));
    }
    if let Some(club_type) = q.club_type {
        query = query.filter(clubs::club_type_id.eq(club_type));
    }
    if let Some(status) = q.status {
        query = query.filter(clubs::status.eq(status));
    }
    if let Some(is_official) = q.is_official {
        query = query.filter(clubs::is_official.eq(is_official));
    }

    Ok(Json(
        query
            .order(communities::id)
            .load::<(Community, Club)>(conn)
            .await?
            .into_iter()
            .map(|(community, club)| ClubResponse { community, club })
            .collect(),
    ))
}

async fn info(
    Extension(pool): Extension<DbPool>,
    MaybeAuth(viewer): MaybeAuth,
    Path(id): Path<i32>,
) -> AppResult<Json<ClubResponse>> {
    let conn = &mut pool.get().await?;

    let community = access::visible_community(conn, viewer, id).await?;
    if community.kind != CommunityKind::Club {
        return Err(AppError::not_found("club"));
    }
    let club = clubs::table.find(id).first::<Club>(conn).await?;

    Ok(Json(ClubResponse { community, club }))
}

#[derive(Deserialize)]
struct NewClubRequest {
    #[serde(flatten)]
    community: CommunityFields,
    club_type: Option<i32>,
    room: Option<String>,
    founded_date: Option<NaiveDate>,
    #[serde(default)]
    status: OperationStatus,
}

/// New clubs start unofficial; only an administrator makes a club official,
/// outside this API. Until then the room, custom URL id and public
/// visibility stay unavailable, and no community event can be held under
/// the club.
async fn create(
    Extension(pool): Extension<DbPool>,
    ExtractAuth(user_id): ExtractAuth,
    Json(req): Json<NewClubRequest>,
) -> AppResult<(StatusCode, Json<ClubResponse>)> {
    let conn = &mut pool.get().await?;

    // community_id is filled in once the shared row exists
    let mut club = Club {
        community_id: 0,
        club_type_id: req.club_type,
        room: req.room,
        founded_date: req.founded_date,
        is_official: false,
        status: req.status,
    };
    let mut errors = req.community.taken(conn).await?;
    if let Err(e) = hierarchy::check_club(req.community.exposure(), &club) {
        errors.extend(e);
    }
    errors.into_result()?;

    let response = conn
        .transaction::<_, AppError, _>(|conn| {
            Box::pin(async move {
                let community =
                    community::insert_community(conn, CommunityKind::Club, req.community, user_id)
                        .await?;
                club.community_id = community.id;

                diesel::insert_into(clubs::table)
                    .values(&club)
                    .execute(conn)
                    .await?;
                Ok(ClubResponse { community, club })
            })
        })
        .await?;

    Ok((StatusCode::CREATED, Json(response)))
}

#[derive(Deserialize)]
struct ClubPatch {
    #[serde(flatten)]
    community: CommunityPatch,
    #[serde(default, deserialize_with = "nullable")]
    club_type: Option<Option<i32>>,
    #[serde(default, deserialize_with = "nullable")]
    room: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    founded_date: Option<Option<NaiveDate>>,
    status: Option<OperationStatus>,
}

async fn update(
    Extension(pool): Extension<DbPool>,
    ExtractAuth(user_id): ExtractAuth,
    Path(id): Path<i32>,
    Json(req): Json<ClubPatch>,
) -> AppResult<Json<ClubResponse>> {
    let conn = &mut pool.get().await?;

    let mut community =
        community::editable_community(conn, user_id, id, CommunityKind::Club).await?;
    let mut club = clubs::table.find(id).first::<Club>(conn).await?;

    let mut errors = ValidationErrors::new();
    if let Err(e) = req.community.apply(&mut community, user_id) {
        errors.extend(e);
    }
    errors.extend(community::taken_by_others(conn, &community).await?);
    if let Some(club_type) = req.club_type {
        club.club_type_id = club_type;
    }
    if let Some(room) = req.room {
        club.room = room;
    }
    if let Some(founded_date) = req.founded_date {
        club.founded_date = founded_date;
    }
    if let Some(status) = req.status {
        club.status = status;
    }
    if let Err(e) = hierarchy::check_club((&community).into(), &club) {
        errors.extend(e);
    }
    errors.into_result()?;

    let response = conn
        .transaction::<_, AppError, _>(|conn| {
            Box::pin(async move {
                let community = community::save_community(conn, &community).await?;
                let club = diesel::update(clubs::table.find(id))
                    .set(&club)
                    .get_result::<Club>(conn)
                    .await?;
                Ok(ClubResponse { community, club })
            })
        })
        .await?;

    Ok(Json(response))
}

async fn delete(
    Extension(pool): Extension<DbPool>,
    ExtractAuth(user_id): ExtractAuth,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    community::remove(&pool, user_id, id, Some(CommunityKind::Club)).await
}

pub fn app() -> Router {
    Router::new()
        .route("/", get(list).post(create))
        .route(
            "/:id",
            get(info).patch(update).put(update).delete(delete),
        )
}

use super::{
    community::{self, CommunityFields, CommunityPatch},
    nullable,
};
use crate::{
    access,
    auth::{ExtractAuth, MaybeAuth},
    error::{AppError, AppResult},
    models::{Community, CommunityKind, Lab, OperationStatus},
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
struct LabResponse {
    #[serde(flatten)]
    community: Community,
    #[serde(flatten)]
    lab: Lab,
}

#[derive(Deserialize)]
struct LabQuery {
    status: Option<OperationStatus>,
}

async fn list(
    Extension(pool): Extension<DbPool>,
    MaybeAuth(viewer): MaybeAuth,
    Query(q): Query<LabQuery>,
) -> AppResult<Json<Vec<LabResponse>>> {
    let conn = &mut pool.get().await?;

    let mut query = communities::table
        .inner_join(labs::table)
        .select((communities::all_columns, labs::all_columns))
        .into_boxed();
    if viewer.public_only() {
        query = query.filter(communities::is_publicly_visible.eq(true));
    }
    if let Some(status) = q.status {
        query = query.filter(labs::status.eq(status));
    }

    Ok(Json(
        query
            .order(communities::id)
            .load::<(Community, Lab)>(conn)
            .await?
            .into_iter()
            .map(|(community, lab)| LabResponse { community, lab })
            .collect(),
    ))
}

async fn info(
    Extension(pool): Extension<DbPool>,
    MaybeAuth(viewer): MaybeAuth,
    Path(id): Path<i32>,
) -> AppResult<Json<LabResponse>> {
    let conn = &mut pool.get().await?;

    let community = access::visible_community(conn, viewer, id).await?;
    if community.kind != CommunityKind::Lab {
        return Err(AppError::not_found("lab"));
    }
    let lab = labs::table.find(id).first::<Lab>(conn).await?;

    Ok(Json(LabResponse { community, lab }))
}

#[derive(Deserialize)]
struct NewLabRequest {
    #[serde(flatten)]
    community: CommunityFields,
    room: Option<String>,
    founded_date: Option<NaiveDate>,
    tags: Option<String>,
    #[serde(default)]
    status: OperationStatus,
}

async fn create(
    Extension(pool): Extension<DbPool>,
    ExtractAuth(user_id): ExtractAuth,
    Json(req): Json<NewLabRequest>,
) -> AppResult<(StatusCode, Json<LabResponse>)> {
    let conn = &mut pool.get().await?;

    req.community.taken(conn).await?.into_result()?;

    let response = conn
        .transaction::<_, AppError, _>(|conn| {
            Box::pin(async move {
                let community =
                    community::insert_community(conn, CommunityKind::Lab, req.community, user_id)
                        .await?;
                let lab = Lab {
                    community_id: community.id,
                    room: req.room,
                    founded_date: req.founded_date,
                    tags: req.tags,
                    status: req.status,
                };

                diesel::insert_into(labs::table)
                    .values(&lab)
                    .execute(conn)
                    .await?;
                Ok(LabResponse { community, lab })
            })
        })
        .await?;

    Ok((StatusCode::CREATED, Json(response)))
}

#[derive(Deserialize)]
struct LabPatch {
    #[serde(flatten)]
    community: CommunityPatch,
    #[serde(default, deserialize_with = "nullable")]
    room: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    founded_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "nullable")]
    tags: Option<Option<String>>,
    status: Option<OperationStatus>,
}

async fn update(
    Extension(pool): Extension<DbPool>,
    ExtractAuth(user_id): ExtractAuth,
    Path(id): Path<i32>,
    Json(req): Json<LabPatch>,
) -> AppResult<Json<LabResponse>> {
    let conn = &mut pool.get().await?;

    let mut community =
        community::editable_community(conn, user_id, id, CommunityKind::Lab).await?;
    let mut lab = labs::table.find(id).first::<Lab>(conn).await?;

    let mut errors = ValidationErrors::new();
    if let Err(e) = req.community.apply(&mut community, user_id) {
        errors.extend(e);
    }
    errors.extend(community::taken_by_others(conn, &community).await?);
    errors.into_result()?;
    if let Some(room) = req.room {
        lab.room = room;
    }
    if let Some(founded_date) = req.founded_date {
        lab.founded_date = founded_date;
    }
    if let Some(tags) = req.tags {
        lab.tags = tags;
    }
    if let Some(status) = req.status {
        lab.status = status;
    }

    let response = conn
        .transaction::<_, AppError, _>(|conn| {
            Box::pin(async move {
                let community = community::save_community(conn, &community).await?;
                let lab = diesel::update(labs::table.find(id))
                    .set(&lab)
                    .get_result::<Lab>(conn)
                    .await?;
                Ok(LabResponse { community, lab })
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
    community::remove(&pool, user_id, id, Some(CommunityKind::Lab)).await
}

pub fn app() -> Router {
    Router::new()
        .route("/", get(list).post(create))
        .route(
            "/:id",
            get(info).patch(update).put(update).delete(delete),
        )
}

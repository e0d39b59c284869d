use super::{
    community::{self, CommunityFields, CommunityPatch},
    event::{EventFields, EventPatch},
};
use crate::{
    access,
    auth::{ExtractAuth, MaybeAuth},
    error::{AppError, AppResult},
    hierarchy,
    models::{Community, CommunityEvent, CommunityKind, Event},
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
use diesel::prelude::*;
use diesel_async::{AsyncConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
struct CommunityEventResponse {
    #[serde(flatten)]
    community: Community,
    #[serde(flatten)]
    event: Event,
    #[serde(flatten)]
    community_event: CommunityEvent,
}

#[derive(Deserialize)]
struct CommunityEventQuery {
    created_under: Option<i32>,
    is_cancelled: Option<bool>,
}

async fn list(
    Extension(pool): Extension<DbPool>,
    MaybeAuth(viewer): MaybeAuth,
    Query(q): Query<CommunityEventQuery>,
) -> AppResult<Json<Vec<CommunityEventResponse>>> {
    let conn = &mut pool.get().await?;

    let mut query = events::table
        .inner_join(communities::table)
        .inner_join(community_events::table)
        .select((
            communities::all_columns,
            events::all_columns,
            community_events::all_columns,
        ))
        .into_boxed();
    if viewer.public_only() {
        query = query.filter(communities::is_publicly_visible.eq(true));
    }
    if let Some(created_under) = q.created_under {
        query = query.filter(community_events::created_under_id.eq(created_under));
    }
    if let Some(is_cancelled) = q.is_cancelled {
        query = query.filter(events::is_cancelled.eq(is_cancelled));
    }

    Ok(Json(
        query
            .order((events::start_date, communities::id))
            .load::<(Community, Event, CommunityEvent)>(conn)
            .await?
            .into_iter()
            .map(|(community, event, community_event)| CommunityEventResponse {
                community,
                event,
                community_event,
            })
            .collect(),
    ))
}

async fn info(
    Extension(pool): Extension<DbPool>,
    MaybeAuth(viewer): MaybeAuth,
    Path(id): Path<i32>,
) -> AppResult<Json<CommunityEventResponse>> {
    let conn = &mut pool.get().await?;

    let community = access::visible_community(conn, viewer, id).await?;
    if community.kind != CommunityKind::CommunityEvent {
        return Err(AppError::not_found("community event"));
    }
    let event = events::table.find(id).first::<Event>(conn).await?;
    let community_event = community_events::table
        .find(id)
        .first::<CommunityEvent>(conn)
        .await?;

    Ok(Json(CommunityEventResponse {
        community,
        event,
        community_event,
    }))
}

fn approved_by_default() -> bool {
    true
}

#[derive(Deserialize)]
struct NewCommunityEventRequest {
    #[serde(flatten)]
    community: CommunityFields,
    #[serde(flatten)]
    event: EventFields,
    created_under: i32,
    #[serde(default)]
    allows_outside_participators: bool,
    #[serde(default = "approved_by_default")]
    is_approved: bool,
}

/// Staff of a club or lab hold events under it; those need no approval.
async fn create(
    Extension(pool): Extension<DbPool>,
    ExtractAuth(user_id): ExtractAuth,
    Json(req): Json<NewCommunityEventRequest>,
) -> AppResult<(StatusCode, Json<CommunityEventResponse>)> {
    let conn = &mut pool.get().await?;

    let parent = access::placement(conn, req.created_under).await?;
    access::require_staff(conn, user_id, parent.id).await?;

    // community ids are filled in once the shared row exists
    let mut event = req.event.into_event(0, req.is_approved);
    let mut errors = req.community.taken(conn).await?;
    if let Err(e) = hierarchy::check_community_event(&event, &parent) {
        errors.extend(e);
    }
    errors.into_result()?;

    let response = conn
        .transaction::<_, AppError, _>(|conn| {
            Box::pin(async move {
                let community = community::insert_community(
                    conn,
                    CommunityKind::CommunityEvent,
                    req.community,
                    user_id,
                )
                .await?;
                event.community_id = community.id;
                let community_event = CommunityEvent {
                    community_id: community.id,
                    created_under_id: parent.id,
                    allows_outside_participators: req.allows_outside_participators,
                };

                diesel::insert_into(events::table)
                    .values(&event)
                    .execute(conn)
                    .await?;
                diesel::insert_into(community_events::table)
                    .values(&community_event)
                    .execute(conn)
                    .await?;

                Ok(CommunityEventResponse {
                    community,
                    event,
                    community_event,
                })
            })
        })
        .await?;

    Ok((StatusCode::CREATED, Json(response)))
}

#[derive(Deserialize)]
struct CommunityEventUpdate {
    #[serde(flatten)]
    community: CommunityPatch,
    #[serde(flatten)]
    event: EventPatch,
    allows_outside_participators: Option<bool>,
    is_approved: Option<bool>,
}

async fn update(
    Extension(pool): Extension<DbPool>,
    ExtractAuth(user_id): ExtractAuth,
    Path(id): Path<i32>,
    Json(req): Json<CommunityEventUpdate>,
) -> AppResult<Json<CommunityEventResponse>> {
    let conn = &mut pool.get().await?;

    let mut community =
        community::editable_community(conn, user_id, id, CommunityKind::CommunityEvent).await?;
    let mut event = events::table.find(id).first::<Event>(conn).await?;
    let mut community_event = community_events::table
        .find(id)
        .first::<CommunityEvent>(conn)
        .await?;
    let parent = access::placement(conn, community_event.created_under_id).await?;

    let mut errors = ValidationErrors::new();
    if let Err(e) = req.community.apply(&mut community, user_id) {
        errors.extend(e);
    }
    errors.extend(community::taken_by_others(conn, &community).await?);
    req.event.apply(&mut event);
    if let Some(is_approved) = req.is_approved {
        event.is_approved = is_approved;
    }
    if let Some(allows) = req.allows_outside_participators {
        community_event.allows_outside_participators = allows;
    }
    if let Err(e) = hierarchy::check_community_event(&event, &parent) {
        errors.extend(e);
    }
    errors.into_result()?;

    let response = conn
        .transaction::<_, AppError, _>(|conn| {
            Box::pin(async move {
                let community = community::save_community(conn, &community).await?;
                let event = diesel::update(events::table.find(id))
                    .set(&event)
                    .get_result::<Event>(conn)
                    .await?;
                let community_event = diesel::update(community_events::table.find(id))
                    .set(&community_event)
                    .get_result::<CommunityEvent>(conn)
                    .await?;
                Ok(CommunityEventResponse {
                    community,
                    event,
                    community_event,
                })
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
    community::remove(&pool, user_id, id, Some(CommunityKind::CommunityEvent)).await
}

pub fn app() -> Router {
    Router::new()
        .route("/", get(list).post(create))
        .route(
            "/:id",
            get(info).patch(update).put(update).delete(delete),
        )
}

use super::{
    community::{self, CommunityFields, CommunityPatch},
    nullable,
};
use crate::{
    access,
    auth::{ExtractAuth, MaybeAuth},
    error::{AppError, AppResult},
    hierarchy,
    models::{Community, CommunityKind, Event},
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
use chrono::{NaiveDate, NaiveTime};
use diesel::prelude::*;
use diesel_async::{AsyncConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
struct EventResponse {
    #[serde(flatten)]
    community: Community,
    #[serde(flatten)]
    event: Event,
}

/// Event columns supplied at creation.
#[derive(Deserialize)]
pub struct EventFields {
    pub event_type: Option<i32>,
    pub event_series: Option<i32>,
    pub location: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

impl EventFields {
    pub fn into_event(self, community_id: i32, is_approved: bool) -> Event {
        Event {
            community_id,
            event_type_id: self.event_type,
            event_series_id: self.event_series,
            location: self.location,
            start_date: self.start_date,
            end_date: self.end_date,
            start_time: self.start_time,
            end_time: self.end_time,
            is_approved,
            is_cancelled: false,
        }
    }
}

#[derive(Deserialize, Default)]
pub struct EventPatch {
    #[serde(default, deserialize_with = "nullable")]
    pub event_type: Option<Option<i32>>,
    #[serde(default, deserialize_with = "nullable")]
    pub event_series: Option<Option<i32>>,
    pub location: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub is_cancelled: Option<bool>,
}

impl EventPatch {
    pub fn apply(self, event: &mut Event) {
        if let Some(event_type) = self.event_type {
            event.event_type_id = event_type;
        }
        if let Some(event_series) = self.event_series {
            event.event_series_id = event_series;
        }
        if let Some(location) = self.location {
            event.location = location;
        }
        if let Some(start_date) = self.start_date {
            event.start_date = start_date;
        }
        if let Some(end_date) = self.end_date {
            event.end_date = end_date;
        }
        if let Some(start_time) = self.start_time {
            event.start_time = start_time;
        }
        if let Some(end_time) = self.end_time {
            event.end_time = end_time;
        }
        if let Some(is_cancelled) = self.is_cancelled {
            event.is_cancelled = is_cancelled;
        }
    }
}

#[derive(Deserialize)]
struct EventQuery {
    event_type: Option<i32>,
    event_series: Option<i32>,
    is_approved: Option<bool>,
    is_cancelled: Option<bool>,
}

/// Lists plain events and community events alike.
async fn list(
    Extension(pool): Extension<DbPool>,
    MaybeAuth(viewer): MaybeAuth,
    Query(q): Query<EventQuery>,
) -> AppResult<Json<Vec<EventResponse>>> {
    let conn = &mut pool.get().await?;

    let mut query = communities::table
        .inner_join(events::table)
        .select((communities::all_columns, events::all_columns))
        .into_boxed();
    if viewer.public_only() {
        query = query.filter(communities::is_publicly_visible.eq(true));
    }
    if let Some(event_type) = q.event_type {
        query = query.filter(events::event_type_id.eq(event_type));
    }
    if let Some(event_series) = q.event_series {
        query = query.filter(events::event_series_id.eq(event_series));
    }
    if let Some(is_approved) = q.is_approved {
        query = query.filter(events::is_approved.eq(is_approved));
    }
    if let Some(is_cancelled) = q.is_cancelled {
        query = query.filter(events::is_cancelled.eq(is_cancelled));
    }

    Ok(Json(
        query
            .order((events::start_date, communities::id))
            .load::<(Community, Event)>(conn)
            .await?
            .into_iter()
            .map(|(community, event)| EventResponse { community, event })
            .collect(),
    ))
}

async fn info(
    Extension(pool): Extension<DbPool>,
    MaybeAuth(viewer): MaybeAuth,
    Path(id): Path<i32>,
) -> AppResult<Json<EventResponse>> {
    let conn = &mut pool.get().await?;

    let community = access::visible_community(conn, viewer, id).await?;
    if !community.kind.is_event() {
        return Err(AppError::not_found("event"));
    }
    let event = events::table.find(id).first::<Event>(conn).await?;

    Ok(Json(EventResponse { community, event }))
}

#[derive(Deserialize)]
struct NewEventRequest {
    #[serde(flatten)]
    community: CommunityFields,
    #[serde(flatten)]
    event: EventFields,
}

/// Stand-alone events wait for approval by an administrator.
async fn create(
    Extension(pool): Extension<DbPool>,
    ExtractAuth(user_id): ExtractAuth,
    Json(req): Json<NewEventRequest>,
) -> AppResult<(StatusCode, Json<EventResponse>)> {
    let conn = &mut pool.get().await?;

    // community_id is filled in once the shared row exists
    let mut event = req.event.into_event(0, false);
    let mut errors = req.community.taken(conn).await?;
    if let Err(e) = hierarchy::check_event(&event) {
        errors.extend(e);
    }
    errors.into_result()?;

    let response = conn
        .transaction::<_, AppError, _>(|conn| {
            Box::pin(async move {
                let community =
                    community::insert_community(conn, CommunityKind::Event, req.community, user_id)
                        .await?;
                event.community_id = community.id;

                diesel::insert_into(events::table)
                    .values(&event)
                    .execute(conn)
                    .await?;
                Ok(EventResponse { community, event })
            })
        })
        .await?;

    Ok((StatusCode::CREATED, Json(response)))
}

#[derive(Deserialize)]
struct EventUpdate {
    #[serde(flatten)]
    community: CommunityPatch,
    #[serde(flatten)]
    event: EventPatch,
}

async fn update(
    Extension(pool): Extension<DbPool>,
    ExtractAuth(user_id): ExtractAuth,
    Path(id): Path<i32>,
    Json(req): Json<EventUpdate>,
) -> AppResult<Json<EventResponse>> {
    let conn = &mut pool.get().await?;

    let mut community =
        community::editable_community(conn, user_id, id, CommunityKind::Event).await?;
    let mut event = events::table.find(id).first::<Event>(conn).await?;

    let mut errors = ValidationErrors::new();
    if let Err(e) = req.community.apply(&mut community, user_id) {
        errors.extend(e);
    }
    errors.extend(community::taken_by_others(conn, &community).await?);
    req.event.apply(&mut event);
    if let Err(e) = hierarchy::check_event(&event) {
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
                Ok(EventResponse { community, event })
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
    community::remove(&pool, user_id, id, Some(CommunityKind::Event)).await
}

pub fn app() -> Router {
    Router::new()
        .route("/", get(list).post(create))
        .route(
            "/:id",
            get(info).patch(update).put(update).delete(delete),
        )
}

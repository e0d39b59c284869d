use crate::{
    error::{AppError, AppResult},
    models::{ClubType, EventSeries, EventType},
    schema::*,
    DbPool,
};
use axum::{extract::Path, routing::get, Extension, Json, Router};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

async fn list_club_types(Extension(pool): Extension<DbPool>) -> AppResult<Json<Vec<ClubType>>> {
    let conn = &mut pool.get().await?;
    Ok(Json(
        club_types::table
            .order(club_types::id)
            .load::<ClubType>(conn)
            .await?,
    ))
}

async fn club_type_info(
    Extension(pool): Extension<DbPool>,
    Path(id): Path<i32>,
) -> AppResult<Json<ClubType>> {
    let conn = &mut pool.get().await?;
    club_types::table
        .find(id)
        .first::<ClubType>(conn)
        .await
        .optional()?
        .map(Json)
        .ok_or_else(|| AppError::not_found("club type"))
}

async fn list_event_types(Extension(pool): Extension<DbPool>) -> AppResult<Json<Vec<EventType>>> {
    let conn = &mut pool.get().await?;
    Ok(Json(
        event_types::table
            .order(event_types::id)
            .load::<EventType>(conn)
            .await?,
    ))
}

async fn event_type_info(
    Extension(pool): Extension<DbPool>,
    Path(id): Path<i32>,
) -> AppResult<Json<EventType>> {
    let conn = &mut pool.get().await?;
    event_types::table
        .find(id)
        .first::<EventType>(conn)
        .await
        .optional()?
        .map(Json)
        .ok_or_else(|| AppError::not_found("event type"))
}

async fn list_event_series(
    Extension(pool): Extension<DbPool>,
) -> AppResult<Json<Vec<EventSeries>>> {
    let conn = &mut pool.get().await?;
    Ok(Json(
        event_series::table
            .order(event_series::id)
            .load::<EventSeries>(conn)
            .await?,
    ))
}

async fn event_series_info(
    Extension(pool): Extension<DbPool>,
    Path(id): Path<i32>,
) -> AppResult<Json<EventSeries>> {
    let conn = &mut pool.get().await?;
    event_series::table
        .find(id)
        .first::<EventSeries>(conn)
        .await
        .optional()?
        .map(Json)
        .ok_or_else(|| AppError::not_found("event series"))
}

pub fn app() -> Router {
    Router::new()
        .route("/club-type", get(list_club_types))
        .route("/club-type/:id", get(club_type_info))
        .route("/event-type", get(list_event_types))
        .route("/event-type/:id", get(event_type_info))
        .route("/event-series", get(list_event_series))
        .route("/event-series/:id", get(event_series_info))
}

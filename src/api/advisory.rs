use crate::{
    access,
    auth::{ExtractAuth, MaybeAuth},
    error::{AppError, AppResult},
    hierarchy,
    models::{Advisory, NewAdvisory},
    schema::*,
    DbPool,
};
use axum::{
    extract::{Path, Query},
    http::StatusCode,
    routing::{delete, get},
    Extension, Json, Router,
};
use chrono::NaiveDate;
use diesel::{dsl::exists, prelude::*};
use diesel_async::RunQueryDsl;
use serde::Deserialize;

#[derive(Deserialize)]
struct AdvisoryQuery {
    community: Option<i32>,
    advisor: Option<i32>,
}

async fn list(
    Extension(pool): Extension<DbPool>,
    MaybeAuth(viewer): MaybeAuth,
    Query(q): Query<AdvisoryQuery>,
) -> AppResult<Json<Vec<Advisory>>> {
    let conn = &mut pool.get().await?;

    let mut query = advisories::table
        .inner_join(communities::table)
        .select(advisories::all_columns)
        .into_boxed();
    if viewer.public_only() {
        query = query.filter(communities::is_publicly_visible.eq(true));
    }
    if let Some(community) = q.community {
        query = query.filter(advisories::community_id.eq(community));
    }
    if let Some(advisor) = q.advisor {
        query = query.filter(advisories::advisor_id.eq(advisor));
    }

    Ok(Json(
        query
            .order(advisories::id)
            .load::<Advisory>(conn)
            .await?,
    ))
}

#[derive(Deserialize)]
struct NewAdvisoryBody {
    advisor: i32,
    community: i32,
    start_date: NaiveDate,
    end_date: Option<NaiveDate>,
}

async fn create(
    Extension(pool): Extension<DbPool>,
    ExtractAuth(user_id): ExtractAuth,
    Json(req): Json<NewAdvisoryBody>,
) -> AppResult<(StatusCode, Json<Advisory>)> {
    let conn = &mut pool.get().await?;

    access::find_community(conn, req.community).await?;
    access::require_staff(conn, user_id, req.community).await?;
    let advisor_exists = diesel::select(exists(users::table.find(req.advisor)))
        .get_result::<bool>(conn)
        .await?;
    if !advisor_exists {
        return Err(AppError::not_found("user"));
    }
    hierarchy::check_period(req.start_date, req.end_date)?;

    let advisory = diesel::insert_into(advisories::table)
        .values(NewAdvisory {
            advisor_id: req.advisor,
            community_id: req.community,
            start_date: req.start_date,
            end_date: req.end_date,
            created_by: Some(user_id),
        })
        .get_result::<Advisory>(conn)
        .await?;

    Ok((StatusCode::CREATED, Json(advisory)))
}

async fn remove(
    Extension(pool): Extension<DbPool>,
    ExtractAuth(user_id): ExtractAuth,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    let conn = &mut pool.get().await?;

    let advisory = advisories::table
        .find(id)
        .first::<Advisory>(conn)
        .await
        .optional()?
        .ok_or_else(|| AppError::not_found("advisory"))?;
    access::require_staff(conn, user_id, advisory.community_id).await?;

    diesel::delete(advisories::table.find(id))
        .execute(conn)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub fn app() -> Router {
    Router::new()
        .route("/", get(list).post(create))
        .route("/:id", delete(remove))
}

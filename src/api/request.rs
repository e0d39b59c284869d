use crate::{
    access,
    auth::ExtractAuth,
    error::{AppError, AppResult},
    models::{ApprovalStatus, NewMembership, NewRequest, Request},
    schema::*,
    workflow::{self, Rank, Standing, TransitionError},
    DbPool,
};
use axum::{
    extract::{Path, Query},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use diesel::{dsl::exists, prelude::*};
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use serde::Deserialize;

async fn find_request(conn: &mut AsyncPgConnection, id: i32) -> AppResult<Request> {
    requests::table
        .find(id)
        .select(Request::as_select())
        .first(conn)
        .await
        .optional()?
        .ok_or_else(|| AppError::not_found("request"))
}

#[derive(Deserialize)]
struct RequestQuery {
    user: Option<i32>,
    community: Option<i32>,
    status: Option<ApprovalStatus>,
}

/// Requests to communities the caller belongs to, plus the caller's own.
async fn list(
    Extension(pool): Extension<DbPool>,
    ExtractAuth(user_id): ExtractAuth,
    Query(q): Query<RequestQuery>,
) -> AppResult<Json<Vec<Request>>> {
    let conn = &mut pool.get().await?;

    let member_of = access::active_community_ids(conn, user_id, false).await?;
    let mut query = requests::table
        .filter(
            requests::community_id
                .eq_any(member_of)
                .or(requests::user_id.eq(user_id)),
        )
        .select(Request::as_select())
        .into_boxed();
    if let Some(user) = q.user {
        query = query.filter(requests::user_id.eq(user));
    }
    if let Some(community) = q.community {
        query = query.filter(requests::community_id.eq(community));
    }
    if let Some(status) = q.status {
        query = query.filter(requests::status.eq(status));
    }

    Ok(Json(query.order(requests::id).load(conn).await?))
}

async fn info(
    Extension(pool): Extension<DbPool>,
    ExtractAuth(user_id): ExtractAuth,
    Path(id): Path<i32>,
) -> AppResult<Json<Request>> {
    let conn = &mut pool.get().await?;

    let request = find_request(conn, id).await?;
    let rank = access::rank(conn, user_id, request.community_id).await?;
    if !workflow::can_view_request(user_id, rank, &request) {
        return Err(AppError::forbidden());
    }

    Ok(Json(request))
}

#[derive(Deserialize)]
struct NewRequestBody {
    community: i32,
}

async fn create(
    Extension(pool): Extension<DbPool>,
    ExtractAuth(user_id): ExtractAuth,
    Json(req): Json<NewRequestBody>,
) -> AppResult<(StatusCode, Json<Request>)> {
    let conn = &mut pool.get().await?;

    let community = access::find_community(conn, req.community).await?;
    let standing = Standing {
        is_active_member: access::rank(conn, user_id, community.id).await?.is_some(),
        has_waiting_request: diesel::select(exists(
            requests::table
                .filter(requests::user_id.eq(user_id))
                .filter(requests::community_id.eq(community.id))
                .filter(requests::status.eq(ApprovalStatus::Waiting)),
        ))
        .get_result::<bool>(conn)
        .await?,
        has_waiting_invitation: false,
    };
    workflow::check_new_request(community.is_accepting_requests, standing)?;

    let request = diesel::insert_into(requests::table)
        .values(NewRequest {
            user_id,
            community_id: community.id,
            status: ApprovalStatus::Waiting,
            updated_by: Some(user_id),
        })
        .get_result::<Request>(conn)
        .await?;
    tracing::info!(request_id = request.id, community_id = community.id, user_id, "request created");

    Ok((StatusCode::CREATED, Json(request)))
}

#[derive(Deserialize)]
struct AnswerBody {
    status: ApprovalStatus,
}

/// Staff accept or decline a waiting request. Acceptance and the new
/// membership commit together.
async fn update(
    Extension(pool): Extension<DbPool>,
    ExtractAuth(user_id): ExtractAuth,
    Path(id): Path<i32>,
    Json(req): Json<AnswerBody>,
) -> AppResult<Json<Request>> {
    let conn = &mut pool.get().await?;

    let request = find_request(conn, id).await?;
    let rank = access::rank(conn, user_id, request.community_id).await?;
    if !workflow::can_answer_request(rank) {
        return Err(AppError::forbidden());
    }
    let transition = workflow::transition(request.status, req.status)?;

    let request = conn
        .transaction::<_, AppError, _>(|conn| {
            Box::pin(async move {
                // only a still-waiting row may move
                let updated = diesel::update(
                    requests::table
                        .find(id)
                        .filter(requests::status.eq(ApprovalStatus::Waiting)),
                )
                .set((
                    requests::status.eq(transition.status),
                    requests::updated_by.eq(Some(user_id)),
                ))
                .get_result::<Request>(conn)
                .await
                .optional()?
                .ok_or(TransitionError::AlreadyResolved)?;

                if transition.grants_membership {
                    diesel::insert_into(memberships::table)
                        .values(NewMembership {
                            user_id: updated.user_id,
                            community_id: updated.community_id,
                            position: Rank::Member.position(),
                            start_date: chrono::Utc::now().naive_utc().date(),
                            created_by: Some(user_id),
                            updated_by: Some(user_id),
                        })
                        .execute(conn)
                        .await?;
                }
                Ok(updated)
            })
        })
        .await?;

    tracing::info!(
        request_id = request.id,
        status = request.status.code(),
        answered_by = user_id,
        "request answered"
    );

    Ok(Json(request))
}

/// Requesters withdraw their own waiting requests.
async fn delete(
    Extension(pool): Extension<DbPool>,
    ExtractAuth(user_id): ExtractAuth,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    let conn = &mut pool.get().await?;

    let request = find_request(conn, id).await?;
    if !workflow::can_cancel_request(user_id, &request) {
        return Err(AppError::forbidden());
    }

    diesel::delete(requests::table.find(id))
        .execute(conn)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub fn app() -> Router {
    Router::new()
        .route("/", get(list).post(create))
        .route("/:id", get(info).patch(update).put(update).delete(delete))
}

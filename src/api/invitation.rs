use crate::{
    access,
    auth::ExtractAuth,
    error::{AppError, AppResult},
    models::{ApprovalStatus, Invitation, NewInvitation, NewMembership},
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

async fn find_invitation(conn: &mut AsyncPgConnection, id: i32) -> AppResult<Invitation> {
    invitations::table
        .find(id)
        .select(Invitation::as_select())
        .first(conn)
        .await
        .optional()?
        .ok_or_else(|| AppError::not_found("invitation"))
}

#[derive(Deserialize)]
struct InvitationQuery {
    community: Option<i32>,
    invitor: Option<i32>,
    invitee: Option<i32>,
    status: Option<ApprovalStatus>,
}

/// Invitations the caller sent or received, plus those of communities the
/// caller staffs.
async fn list(
    Extension(pool): Extension<DbPool>,
    ExtractAuth(user_id): ExtractAuth,
    Query(q): Query<InvitationQuery>,
) -> AppResult<Json<Vec<Invitation>>> {
    let conn = &mut pool.get().await?;

    let staff_of = access::active_community_ids(conn, user_id, true).await?;
    let mut query = invitations::table
        .filter(
            invitations::community_id
                .eq_any(staff_of)
                .or(invitations::invitor_id.eq(user_id))
                .or(invitations::invitee_id.eq(user_id)),
        )
        .select(Invitation::as_select())
        .into_boxed();
    if let Some(community) = q.community {
        query = query.filter(invitations::community_id.eq(community));
    }
    if let Some(invitor) = q.invitor {
        query = query.filter(invitations::invitor_id.eq(invitor));
    }
    if let Some(invitee) = q.invitee {
        query = query.filter(invitations::invitee_id.eq(invitee));
    }
    if let Some(status) = q.status {
        query = query.filter(invitations::status.eq(status));
    }

    Ok(Json(query.order(invitations::id).load(conn).await?))
}

async fn info(
    Extension(pool): Extension<DbPool>,
    ExtractAuth(user_id): ExtractAuth,
    Path(id): Path<i32>,
) -> AppResult<Json<Invitation>> {
    let conn = &mut pool.get().await?;

    let invitation = find_invitation(conn, id).await?;
    let rank = access::rank(conn, user_id, invitation.community_id).await?;
    if !workflow::can_view_invitation(user_id, rank, &invitation) {
        return Err(AppError::forbidden());
    }

    Ok(Json(invitation))
}

#[derive(Deserialize)]
struct NewInvitationBody {
    community: i32,
    invitee: i32,
}

async fn create(
    Extension(pool): Extension<DbPool>,
    ExtractAuth(user_id): ExtractAuth,
    Json(req): Json<NewInvitationBody>,
) -> AppResult<(StatusCode, Json<Invitation>)> {
    let conn = &mut pool.get().await?;

    let community = access::find_community(conn, req.community).await?;
    access::require_staff(conn, user_id, community.id).await?;

    let invitee_exists = diesel::select(exists(users::table.find(req.invitee)))
        .get_result::<bool>(conn)
        .await?;
    if !invitee_exists {
        return Err(AppError::not_found("user"));
    }

    let standing = Standing {
        is_active_member: access::rank(conn, req.invitee, community.id).await?.is_some(),
        has_waiting_request: false,
        has_waiting_invitation: diesel::select(exists(
            invitations::table
                .filter(invitations::invitee_id.eq(req.invitee))
                .filter(invitations::community_id.eq(community.id))
                .filter(invitations::status.eq(ApprovalStatus::Waiting)),
        ))
        .get_result::<bool>(conn)
        .await?,
    };
    workflow::check_new_invitation(standing)?;

    let invitation = diesel::insert_into(invitations::table)
        .values(NewInvitation {
            community_id: community.id,
            invitor_id: user_id,
            invitee_id: req.invitee,
            status: ApprovalStatus::Waiting,
        })
        .get_result::<Invitation>(conn)
        .await?;
    tracing::info!(
        invitation_id = invitation.id,
        community_id = community.id,
        invitee = req.invitee,
        "invitation sent"
    );

    Ok((StatusCode::CREATED, Json(invitation)))
}

#[derive(Deserialize)]
struct AnswerBody {
    status: ApprovalStatus,
}

/// The invitee accepts or declines; acceptance and the new membership
/// commit together.
async fn update(
    Extension(pool): Extension<DbPool>,
    ExtractAuth(user_id): ExtractAuth,
    Path(id): Path<i32>,
    Json(req): Json<AnswerBody>,
) -> AppResult<Json<Invitation>> {
    let conn = &mut pool.get().await?;

    let invitation = find_invitation(conn, id).await?;
    if !workflow::can_answer_invitation(user_id, &invitation) {
        return Err(AppError::forbidden());
    }
    let transition = workflow::transition(invitation.status, req.status)?;

    let invitation = conn
        .transaction::<_, AppError, _>(|conn| {
            Box::pin(async move {
                let updated = diesel::update(
                    invitations::table
                        .find(id)
                        .filter(invitations::status.eq(ApprovalStatus::Waiting)),
                )
                .set(invitations::status.eq(transition.status))
                .get_result::<Invitation>(conn)
                .await
                .optional()?
                .ok_or(TransitionError::AlreadyResolved)?;

                if transition.grants_membership {
                    diesel::insert_into(memberships::table)
                        .values(NewMembership {
                            user_id: updated.invitee_id,
                            community_id: updated.community_id,
                            position: Rank::Member.position(),
                            start_date: chrono::Utc::now().naive_utc().date(),
                            created_by: Some(updated.invitor_id),
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
        invitation_id = invitation.id,
        status = invitation.status.code(),
        "invitation answered"
    );

    Ok(Json(invitation))
}

/// The inviter withdraws a waiting invitation.
async fn delete(
    Extension(pool): Extension<DbPool>,
    ExtractAuth(user_id): ExtractAuth,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    let conn = &mut pool.get().await?;

    let invitation = find_invitation(conn, id).await?;
    if !workflow::can_cancel_invitation(user_id, &invitation) {
        return Err(AppError::forbidden());
    }

    diesel::delete(invitations::table.find(id))
        .execute(conn)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub fn app() -> Router {
    Router::new()
        .route("/", get(list).post(create))
        .route("/:id", get(info).patch(update).put(update).delete(delete))
}

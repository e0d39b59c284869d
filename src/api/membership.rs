use crate::{
    access,
    auth::{ExtractAuth, MaybeAuth},
    error::{AppError, AppResult},
    models::{CustomMembershipLabel, Membership},
    schema::*,
    workflow::{self, Rank},
    DbPool,
};
use axum::{
    extract::{Path, Query},
    http::StatusCode,
    routing::{get, put},
    Extension, Json, Router,
};
use diesel::{prelude::*, upsert::excluded};
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
struct MembershipResponse {
    #[serde(flatten)]
    membership: Membership,
    custom_label: Option<String>,
}

async fn find_membership(conn: &mut AsyncPgConnection, id: i32) -> AppResult<Membership> {
    memberships::table
        .find(id)
        .select(Membership::as_select())
        .first(conn)
        .await
        .optional()?
        .ok_or_else(|| AppError::not_found("membership"))
}

#[derive(Deserialize)]
struct MembershipQuery {
    user: Option<i32>,
    community: Option<i32>,
    position: Option<i32>,
    active: Option<bool>,
}

async fn list(
    Extension(pool): Extension<DbPool>,
    MaybeAuth(viewer): MaybeAuth,
    Query(q): Query<MembershipQuery>,
) -> AppResult<Json<Vec<MembershipResponse>>> {
    let conn = &mut pool.get().await?;

    let mut query = memberships::table
        .inner_join(communities::table)
        .left_join(custom_membership_labels::table)
        .select((
            memberships::all_columns,
            custom_membership_labels::label.nullable(),
        ))
        .into_boxed();
    if viewer.public_only() {
        query = query.filter(communities::is_publicly_visible.eq(true));
    }
    if let Some(user) = q.user {
        query = query.filter(memberships::user_id.eq(user));
    }
    if let Some(community) = q.community {
        query = query.filter(memberships::community_id.eq(community));
    }
    if let Some(position) = q.position {
        query = query.filter(memberships::position.eq(position));
    }
    match q.active {
        Some(true) => query = query.filter(memberships::end_date.is_null()),
        Some(false) => query = query.filter(memberships::end_date.is_not_null()),
        None => {}
    }

    Ok(Json(
        query
            .order(memberships::id)
            .load::<(Membership, Option<String>)>(conn)
            .await?
            .into_iter()
            .map(|(membership, custom_label)| MembershipResponse {
                membership,
                custom_label,
            })
            .collect(),
    ))
}

async fn info(
    Extension(pool): Extension<DbPool>,
    MaybeAuth(viewer): MaybeAuth,
    Path(id): Path<i32>,
) -> AppResult<Json<MembershipResponse>> {
    let conn = &mut pool.get().await?;

    let membership = find_membership(conn, id).await?;
    access::visible_community(conn, viewer, membership.community_id).await?;
    let custom_label = custom_membership_labels::table
        .find(id)
        .select(custom_membership_labels::label)
        .first::<String>(conn)
        .await
        .optional()?;

    Ok(Json(MembershipResponse {
        membership,
        custom_label,
    }))
}

#[derive(Deserialize)]
struct PositionBody {
    position: i32,
}

async fn update(
    Extension(pool): Extension<DbPool>,
    ExtractAuth(user_id): ExtractAuth,
    Path(id): Path<i32>,
    Json(req): Json<PositionBody>,
) -> AppResult<Json<Membership>> {
    let conn = &mut pool.get().await?;

    let membership = find_membership(conn, id).await?;
    if !membership.is_active() {
        return Err(AppError::from(
            StatusCode::BAD_REQUEST,
            "ended memberships are not able to be updated",
        ));
    }
    let new = Rank::from_position(req.position)
        .ok_or_else(|| AppError::from(StatusCode::BAD_REQUEST, "invalid position"))?;
    let current = Rank::from_position(membership.position)
        .ok_or_else(|| anyhow::anyhow!("invalid membership position {}", membership.position))?;

    let actor = access::rank(conn, user_id, membership.community_id).await?;
    if !workflow::can_change_position(actor, current, new) {
        return Err(AppError::forbidden());
    }

    let membership = diesel::update(memberships::table.find(id))
        .set((
            memberships::position.eq(new.position()),
            memberships::updated_by.eq(Some(user_id)),
        ))
        .get_result::<Membership>(conn)
        .await?;
    tracing::info!(membership_id = id, position = new.position(), user_id, "position changed");

    Ok(Json(membership))
}

/// Ends a membership: leaving when the caller is the member, removal when
/// the caller is staff outranking the member.
async fn end(
    Extension(pool): Extension<DbPool>,
    ExtractAuth(user_id): ExtractAuth,
    Path(id): Path<i32>,
) -> AppResult<Json<Membership>> {
    let conn = &mut pool.get().await?;

    let membership = find_membership(conn, id).await?;
    let actor = access::rank(conn, user_id, membership.community_id).await?;
    let reason = workflow::end_reason(user_id, actor, &membership).ok_or_else(AppError::forbidden)?;

    let membership = diesel::update(memberships::table.find(id))
        .set((
            memberships::end_date.eq(Some(chrono::Utc::now().naive_utc().date())),
            memberships::end_reason.eq(Some(reason)),
            memberships::updated_by.eq(Some(user_id)),
        ))
        .get_result::<Membership>(conn)
        .await?;
    tracing::info!(membership_id = id, reason = reason.code(), user_id, "membership ended");

    Ok(Json(membership))
}

#[derive(Deserialize)]
struct LabelBody {
    label: String,
}

async fn set_label(
    Extension(pool): Extension<DbPool>,
    ExtractAuth(user_id): ExtractAuth,
    Path(id): Path<i32>,
    Json(req): Json<LabelBody>,
) -> AppResult<Json<CustomMembershipLabel>> {
    let conn = &mut pool.get().await?;

    let membership = find_membership(conn, id).await?;
    access::require_staff(conn, user_id, membership.community_id).await?;

    let label = diesel::insert_into(custom_membership_labels::table)
        .values(CustomMembershipLabel {
            membership_id: id,
            label: req.label,
        })
        .on_conflict(custom_membership_labels::membership_id)
        .do_update()
        .set(custom_membership_labels::label.eq(excluded(custom_membership_labels::label)))
        .get_result::<CustomMembershipLabel>(conn)
        .await?;

    Ok(Json(label))
}

async fn clear_label(
    Extension(pool): Extension<DbPool>,
    ExtractAuth(user_id): ExtractAuth,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    let conn = &mut pool.get().await?;

    let membership = find_membership(conn, id).await?;
    access::require_staff(conn, user_id, membership.community_id).await?;

    diesel::delete(custom_membership_labels::table.find(id))
        .execute(conn)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub fn app() -> Router {
    Router::new()
        .route("/", get(list))
        .route("/:id", get(info).patch(update).delete(end))
        .route("/:id/label", put(set_label).delete(clear_label))
}

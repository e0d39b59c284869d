//! Lookups the handlers share: resolving a community to its kind and
//! loading where the caller stands in it.

use crate::{
    error::{AppError, AppResult},
    hierarchy::{Placement, PlacementKind},
    models::{Community, CommunityKind},
    schema::*,
    visibility::Viewer,
    workflow::Rank,
};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

pub async fn find_community(conn: &mut AsyncPgConnection, id: i32) -> AppResult<Community> {
    communities::table
        .find(id)
        .select(Community::as_select())
        .first(conn)
        .await
        .optional()?
        .ok_or_else(|| AppError::not_found("community"))
}

/// Community `id` for a reader, hiding non-public ones from anonymous callers.
pub async fn visible_community(
    conn: &mut AsyncPgConnection,
    viewer: Viewer,
    id: i32,
) -> AppResult<Community> {
    let community = find_community(conn, id).await?;
    if !viewer.can_see(community.is_publicly_visible) {
        return Err(AppError::unauthorized());
    }
    Ok(community)
}

/// Resolves the kind of `community` once, from its discriminator.
pub async fn placement_of(
    conn: &mut AsyncPgConnection,
    community: &Community,
) -> AppResult<Placement> {
    let kind = match community.kind {
        CommunityKind::Club => PlacementKind::Club {
            is_official: clubs::table
                .find(community.id)
                .select(clubs::is_official)
                .first(conn)
                .await?,
        },
        CommunityKind::CommunityEvent => PlacementKind::CommunityEvent {
            created_under: community_events::table
                .find(community.id)
                .select(community_events::created_under_id)
                .first(conn)
                .await?,
        },
        CommunityKind::Event => PlacementKind::Event,
        CommunityKind::Lab => PlacementKind::Lab,
    };

    Ok(Placement {
        id: community.id,
        kind,
    })
}

pub async fn placement(conn: &mut AsyncPgConnection, id: i32) -> AppResult<Placement> {
    let community = find_community(conn, id).await?;
    placement_of(conn, &community).await
}

/// Rank of `user_id` through an active membership, if any.
pub async fn rank(
    conn: &mut AsyncPgConnection,
    user_id: i32,
    community_id: i32,
) -> AppResult<Option<Rank>> {
    let position = memberships::table
        .filter(memberships::user_id.eq(user_id))
        .filter(memberships::community_id.eq(community_id))
        .filter(memberships::end_date.is_null())
        .select(memberships::position)
        .first::<i32>(conn)
        .await
        .optional()?;

    let Some(position) = position else {
        return Ok(None);
    };
    let rank = Rank::from_position(position)
        .ok_or_else(|| anyhow::anyhow!("invalid membership position {position}"))?;
    Ok(Some(rank))
}

pub async fn require_staff(
    conn: &mut AsyncPgConnection,
    user_id: i32,
    community_id: i32,
) -> AppResult<Rank> {
    match rank(conn, user_id, community_id).await? {
        Some(rank) if rank.is_staff() => Ok(rank),
        _ => Err(AppError::forbidden()),
    }
}

/// Ids of communities where `user_id` holds an active membership.
pub async fn active_community_ids(
    conn: &mut AsyncPgConnection,
    user_id: i32,
    staff_only: bool,
) -> AppResult<Vec<i32>> {
    let mut query = memberships::table
        .filter(memberships::user_id.eq(user_id))
        .filter(memberships::end_date.is_null())
        .select(memberships::community_id)
        .into_boxed();
    if staff_only {
        query = query.filter(memberships::position.ge(Rank::Staff.position()));
    }
    Ok(query.load(conn).await?)
}

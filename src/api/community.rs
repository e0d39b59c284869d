//! Columns and handlers shared by every community kind.

use super::nullable;
use crate::{
    access,
    auth::{ExtractAuth, MaybeAuth},
    error::{AppError, AppResult, UNIQUE},
    hierarchy::Exposure,
    media,
    models::{Community, CommunityKind, CommunityUpdate, NewCommunity, NewMembership},
    schema::*,
    validation::ValidationErrors,
    workflow::Rank,
    DbPool,
};
use axum::{
    extract::{Path, Query},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::Deserialize;

/// Fields every community is created with.
#[derive(Deserialize)]
pub struct CommunityFields {
    pub name_th: String,
    pub name_en: String,
    #[serde(default)]
    pub url_id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub external_links: Option<String>,
    #[serde(default)]
    pub is_publicly_visible: bool,
    #[serde(default = "accepting_by_default")]
    pub is_accepting_requests: bool,
}

fn accepting_by_default() -> bool {
    true
}

impl CommunityFields {
    pub fn exposure(&self) -> Exposure<'_> {
        Exposure {
            url_id: self.url_id.as_deref(),
            is_publicly_visible: self.is_publicly_visible,
        }
    }

    pub async fn taken(&self, conn: &mut AsyncPgConnection) -> AppResult<ValidationErrors> {
        taken_names(conn, &self.name_th, &self.name_en, self.url_id.as_deref(), None).await
    }
}

/// Partial update of the shared columns. `logo` and `banner` take the
/// uploaded file name and are stored under the media path convention.
#[derive(Deserialize, Default)]
pub struct CommunityPatch {
    pub name_th: Option<String>,
    pub name_en: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub url_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub external_links: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub logo: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub banner: Option<Option<String>>,
    pub is_publicly_visible: Option<bool>,
    pub is_accepting_requests: Option<bool>,
}

impl CommunityPatch {
    pub fn apply(self, community: &mut Community, user_id: i32) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Some(name_th) = self.name_th {
            community.name_th = name_th;
        }
        if let Some(name_en) = self.name_en {
            community.name_en = name_en;
        }
        if let Some(url_id) = self.url_id {
            community.url_id = url_id;
        }
        if let Some(description) = self.description {
            community.description = description;
        }
        if let Some(external_links) = self.external_links {
            community.external_links = external_links;
        }
        if let Some(logo) = self.logo {
            community.logo = match logo {
                Some(name) => media::logo_path(community.id, &name)
                    .map_err(|e| errors.extend(e))
                    .ok(),
                None => None,
            };
        }
        if let Some(banner) = self.banner {
            community.banner = match banner {
                Some(name) => media::banner_path(community.id, &name)
                    .map_err(|e| errors.extend(e))
                    .ok(),
                None => None,
            };
        }
        if let Some(visible) = self.is_publicly_visible {
            community.is_publicly_visible = visible;
        }
        if let Some(accepting) = self.is_accepting_requests {
            community.is_accepting_requests = accepting;
        }
        community.updated_by = Some(user_id);

        errors.into_result()
    }
}

/// Names and URL id another community already holds, one `unique` violation
/// each. The table constraints still decide when two writes race.
pub async fn taken_names(
    conn: &mut AsyncPgConnection,
    name_th: &str,
    name_en: &str,
    url_id: Option<&str>,
    except: Option<i32>,
) -> AppResult<ValidationErrors> {
    let mut query = communities::table
        .filter(
            communities::name_th
                .eq(name_th)
                .or(communities::name_en.eq(name_en))
                .or(communities::url_id.eq(url_id)),
        )
        .select((communities::name_th, communities::name_en, communities::url_id))
        .into_boxed();
    if let Some(id) = except {
        query = query.filter(communities::id.ne(id));
    }
    let holders = query.load::<(String, String, Option<String>)>(conn).await?;

    let mut errors = ValidationErrors::new();
    if holders.iter().any(|(th, _, _)| th == name_th) {
        errors.push(format!("A community named `{name_th}` already exists."), UNIQUE);
    }
    if holders.iter().any(|(_, en, _)| en == name_en) {
        errors.push(format!("A community named `{name_en}` already exists."), UNIQUE);
    }
    if let Some(url_id) = url_id {
        if holders.iter().any(|(_, _, u)| u.as_deref() == Some(url_id)) {
            errors.push(format!("The URL ID `{url_id}` is already taken."), UNIQUE);
        }
    }
    Ok(errors)
}

/// Same as [`taken_names`] for a stored community after a patch was applied.
pub async fn taken_by_others(
    conn: &mut AsyncPgConnection,
    community: &Community,
) -> AppResult<ValidationErrors> {
    taken_names(
        conn,
        &community.name_th,
        &community.name_en,
        community.url_id.as_deref(),
        Some(community.id),
    )
    .await
}

/// Inserts the shared row and makes the creator its head.
pub async fn insert_community(
    conn: &mut AsyncPgConnection,
    kind: CommunityKind,
    fields: CommunityFields,
    user_id: i32,
) -> AppResult<Community> {
    let community = diesel::insert_into(communities::table)
        .values(NewCommunity {
            kind,
            name_th: fields.name_th,
            name_en: fields.name_en,
            url_id: fields.url_id,
            description: fields.description,
            external_links: fields.external_links,
            is_publicly_visible: fields.is_publicly_visible,
            is_accepting_requests: fields.is_accepting_requests,
            created_by: Some(user_id),
            updated_by: Some(user_id),
        })
        .get_result::<Community>(conn)
        .await?;

    diesel::insert_into(memberships::table)
        .values(NewMembership {
            user_id,
            community_id: community.id,
            position: Rank::Head.position(),
            start_date: chrono::Utc::now().naive_utc().date(),
            created_by: Some(user_id),
            updated_by: Some(user_id),
        })
        .execute(conn)
        .await?;

    tracing::info!(
        community_id = community.id,
        kind = community.kind.code(),
        user_id,
        "community created"
    );

    Ok(community)
}

pub async fn save_community(conn: &mut AsyncPgConnection, community: &Community) -> AppResult<Community> {
    Ok(diesel::update(communities::table.find(community.id))
        .set(CommunityUpdate::from(community))
        .get_result::<Community>(conn)
        .await?)
}

/// Loads community `id` for an update by its staff, checking its kind.
pub async fn editable_community(
    conn: &mut AsyncPgConnection,
    user_id: i32,
    id: i32,
    kind: CommunityKind,
) -> AppResult<Community> {
    let community = access::find_community(conn, id).await?;
    if community.kind != kind {
        return Err(AppError::not_found(kind_name(kind)));
    }
    access::require_staff(conn, user_id, id).await?;
    Ok(community)
}

pub fn kind_name(kind: CommunityKind) -> &'static str {
    match kind {
        CommunityKind::Club => "club",
        CommunityKind::Event => "event",
        CommunityKind::CommunityEvent => "community event",
        CommunityKind::Lab => "lab",
    }
}

#[derive(Deserialize)]
struct CommunityQuery {
    kind: Option<CommunityKind>,
    url_id: Option<String>,
}

async fn list(
    Extension(pool): Extension<DbPool>,
    MaybeAuth(viewer): MaybeAuth,
    Query(q): Query<CommunityQuery>,
) -> AppResult<Json<Vec<Community>>> {
    let conn = &mut pool.get().await?;

    let mut query = communities::table
        .select(Community::as_select())
        .into_boxed();
    if viewer.public_only() {
        query = query.filter(communities::is_publicly_visible.eq(true));
    }
    if let Some(kind) = q.kind {
        query = query.filter(communities::kind.eq(kind));
    }
    if let Some(url_id) = q.url_id {
        query = query.filter(communities::url_id.eq(url_id));
    }

    Ok(Json(query.order(communities::id).load(conn).await?))
}

async fn info(
    Extension(pool): Extension<DbPool>,
    MaybeAuth(viewer): MaybeAuth,
    Path(id): Path<i32>,
) -> AppResult<Json<Community>> {
    let conn = &mut pool.get().await?;
    Ok(Json(access::visible_community(conn, viewer, id).await?))
}

/// Only the head deletes a community. Communities that community events
/// were created under stay until those events are gone. With `kind` set the
/// community must be of that kind.
pub async fn remove(
    pool: &DbPool,
    user_id: i32,
    id: i32,
    kind: Option<CommunityKind>,
) -> AppResult<StatusCode> {
    let conn = &mut pool.get().await?;

    let community = access::find_community(conn, id).await?;
    if let Some(kind) = kind {
        if community.kind != kind {
            return Err(AppError::not_found(kind_name(kind)));
        }
    }
    if access::rank(conn, user_id, id).await? != Some(Rank::Head) {
        return Err(AppError::forbidden());
    }

    diesel::delete(communities::table.find(id))
        .execute(conn)
        .await?;
    tracing::info!(community_id = id, kind = community.kind.code(), user_id, "community deleted");

    Ok(StatusCode::NO_CONTENT)
}

async fn delete(
    Extension(pool): Extension<DbPool>,
    ExtractAuth(user_id): ExtractAuth,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    remove(&pool, user_id, id, None).await
}

pub fn app() -> Router {
    Router::new()
        .route("/", get(list))
        .route("/:id", get(info).delete(delete))
}

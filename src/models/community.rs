use super::{CommunityKind, OperationStatus};
use crate::schema::*;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use diesel::prelude::*;
use serde::Serialize;

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = communities)]
pub struct Community {
    pub id: i32,
    pub kind: CommunityKind,
    pub name_th: String,
    pub name_en: String,
    pub url_id: Option<String>,
    pub description: Option<String>,
    pub external_links: Option<String>,
    pub logo: Option<String>,
    pub banner: Option<String>,
    pub is_publicly_visible: bool,
    pub is_accepting_requests: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub created_by: Option<i32>,
    pub updated_by: Option<i32>,
}

#[derive(
    Debug, Clone, Queryable, Selectable, Identifiable, Associations, Insertable, AsChangeset, Serialize,
)]
#[diesel(belongs_to(Community))]
#[diesel(primary_key(community_id))]
#[diesel(table_name = clubs)]
#[diesel(treat_none_as_null = true)]
pub struct Club {
    #[serde(skip)]
    pub community_id: i32,
    pub club_type_id: Option<i32>,
    pub room: Option<String>,
    pub founded_date: Option<NaiveDate>,
    pub is_official: bool,
    pub status: OperationStatus,
}

#[derive(
    Debug, Clone, Queryable, Selectable, Identifiable, Associations, Insertable, AsChangeset, Serialize,
)]
#[diesel(belongs_to(Community))]
#[diesel(primary_key(community_id))]
#[diesel(table_name = events)]
#[diesel(treat_none_as_null = true)]
pub struct Event {
    #[serde(skip)]
    pub community_id: i32,
    pub event_type_id: Option<i32>,
    pub event_series_id: Option<i32>,
    pub location: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub is_approved: bool,
    pub is_cancelled: bool,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Insertable, AsChangeset, Serialize)]
#[diesel(primary_key(community_id))]
#[diesel(table_name = community_events)]
#[diesel(treat_none_as_null = true)]
pub struct CommunityEvent {
    #[serde(skip)]
    pub community_id: i32,
    pub created_under_id: i32,
    pub allows_outside_participators: bool,
}

#[derive(
    Debug, Clone, Queryable, Selectable, Identifiable, Associations, Insertable, AsChangeset, Serialize,
)]
#[diesel(belongs_to(Community))]
#[diesel(primary_key(community_id))]
#[diesel(table_name = labs)]
#[diesel(treat_none_as_null = true)]
pub struct Lab {
    #[serde(skip)]
    pub community_id: i32,
    pub room: Option<String>,
    pub founded_date: Option<NaiveDate>,
    pub tags: Option<String>,
    pub status: OperationStatus,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = communities)]
pub struct NewCommunity {
    pub kind: CommunityKind,
    pub name_th: String,
    pub name_en: String,
    pub url_id: Option<String>,
    pub description: Option<String>,
    pub external_links: Option<String>,
    pub is_publicly_visible: bool,
    pub is_accepting_requests: bool,
    pub created_by: Option<i32>,
    pub updated_by: Option<i32>,
}

/// The editable columns shared by every community kind.
#[derive(Debug, AsChangeset)]
#[diesel(table_name = communities)]
#[diesel(treat_none_as_null = true)]
pub struct CommunityUpdate<'a> {
    pub name_th: &'a str,
    pub name_en: &'a str,
    pub url_id: Option<&'a str>,
    pub description: Option<&'a str>,
    pub external_links: Option<&'a str>,
    pub logo: Option<&'a str>,
    pub banner: Option<&'a str>,
    pub is_publicly_visible: bool,
    pub is_accepting_requests: bool,
    pub updated_by: Option<i32>,
}

impl<'a> From<&'a Community> for CommunityUpdate<'a> {
    fn from(c: &'a Community) -> Self {
        Self {
            name_th: &c.name_th,
            name_en: &c.name_en,
            url_id: c.url_id.as_deref(),
            description: c.description.as_deref(),
            external_links: c.external_links.as_deref(),
            logo: c.logo.as_deref(),
            banner: c.banner.as_deref(),
            is_publicly_visible: c.is_publicly_visible,
            is_accepting_requests: c.is_accepting_requests,
            updated_by: c.updated_by,
        }
    }
}

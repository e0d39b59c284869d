use crate::schema::*;
use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::Serialize;

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = announcements)]
pub struct Announcement {
    pub id: i32,
    pub text: String,
    pub image: Option<String>,
    pub community_id: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub created_by: Option<i32>,
    pub updated_by: Option<i32>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = announcements)]
pub struct NewAnnouncement {
    pub text: String,
    pub image: Option<String>,
    pub community_id: i32,
    pub created_by: Option<i32>,
    pub updated_by: Option<i32>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = albums)]
pub struct Album {
    pub id: i32,
    pub name: String,
    pub community_id: i32,
    pub community_event_id: Option<i32>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub created_by: Option<i32>,
    pub updated_by: Option<i32>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = albums)]
pub struct NewAlbum {
    pub name: String,
    pub community_id: i32,
    pub community_event_id: Option<i32>,
    pub created_by: Option<i32>,
    pub updated_by: Option<i32>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations, Serialize)]
#[diesel(belongs_to(Album))]
#[diesel(table_name = album_images)]
pub struct AlbumImage {
    pub id: i32,
    pub album_id: i32,
    pub image: String,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = comments)]
pub struct Comment {
    pub id: i32,
    pub text: String,
    pub written_by: String,
    pub event_id: i32,
    pub created_at: NaiveDateTime,
    pub created_by: Option<i32>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = comments)]
pub struct NewComment {
    pub text: String,
    pub written_by: String,
    pub event_id: i32,
    pub created_by: Option<i32>,
}

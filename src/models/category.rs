use crate::schema::*;
use diesel::prelude::*;
use serde::Serialize;

#[derive(Debug, Clone, Queryable, Identifiable, Serialize)]
#[diesel(table_name = club_types)]
pub struct ClubType {
    pub id: i32,
    pub name_th: String,
    pub name_en: String,
}

#[derive(Debug, Clone, Queryable, Identifiable, Serialize)]
#[diesel(table_name = event_types)]
pub struct EventType {
    pub id: i32,
    pub name_th: String,
    pub name_en: String,
}

#[derive(Debug, Clone, Queryable, Identifiable, Serialize)]
#[diesel(table_name = event_series)]
pub struct EventSeries {
    pub id: i32,
    pub name_th: String,
    pub name_en: String,
}

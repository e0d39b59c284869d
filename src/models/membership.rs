use super::{ApprovalStatus, EndReason};
use crate::schema::*;
use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use serde::Serialize;

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = requests)]
pub struct Request {
    pub id: i32,
    pub user_id: i32,
    pub community_id: i32,
    pub status: ApprovalStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub updated_by: Option<i32>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = requests)]
pub struct NewRequest {
    pub user_id: i32,
    pub community_id: i32,
    pub status: ApprovalStatus,
    pub updated_by: Option<i32>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = invitations)]
pub struct Invitation {
    pub id: i32,
    pub community_id: i32,
    pub invitor_id: i32,
    pub invitee_id: i32,
    pub invited_at: NaiveDateTime,
    pub status: ApprovalStatus,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = invitations)]
pub struct NewInvitation {
    pub community_id: i32,
    pub invitor_id: i32,
    pub invitee_id: i32,
    pub status: ApprovalStatus,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = advisories)]
pub struct Advisory {
    pub id: i32,
    pub advisor_id: i32,
    pub community_id: i32,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub created_by: Option<i32>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = advisories)]
pub struct NewAdvisory {
    pub advisor_id: i32,
    pub community_id: i32,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub created_by: Option<i32>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = memberships)]
pub struct Membership {
    pub id: i32,
    pub user_id: i32,
    pub community_id: i32,
    pub position: i32,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub end_reason: Option<EndReason>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub created_by: Option<i32>,
    pub updated_by: Option<i32>,
}

impl Membership {
    pub fn is_active(&self) -> bool {
        self.end_date.is_none()
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = memberships)]
pub struct NewMembership {
    pub user_id: i32,
    pub community_id: i32,
    pub position: i32,
    pub start_date: NaiveDate,
    pub created_by: Option<i32>,
    pub updated_by: Option<i32>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Insertable, Serialize)]
#[diesel(primary_key(membership_id))]
#[diesel(table_name = custom_membership_labels)]
pub struct CustomMembershipLabel {
    pub membership_id: i32,
    pub label: String,
}

//! Placement rules between community kinds and the assets attached to them.
//!
//! Every check collects all violations before returning, so a caller sees
//! the full list of broken rules in one response.

use crate::{
    models::{Club, Community, CommunityKind, Event},
    validation::ValidationErrors,
};
use chrono::NaiveDate;

pub const UNOFFICIAL_CLUB_LIMITATIONS: &str = "unofficial_club_limitations";
pub const DATE_PERIOD_ERROR: &str = "date_period_error";
pub const HIERARCHY_ERROR: &str = "hierarchy_error";
pub const STATUS_ERROR: &str = "status_error";

/// A community id resolved to its concrete kind, along with the facts
/// about that kind the placement rules look at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub id: i32,
    pub kind: PlacementKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementKind {
    Club { is_official: bool },
    Event,
    CommunityEvent { created_under: i32 },
    Lab,
}

impl PlacementKind {
    pub fn community_kind(self) -> CommunityKind {
        match self {
            PlacementKind::Club { .. } => CommunityKind::Club,
            PlacementKind::Event => CommunityKind::Event,
            PlacementKind::CommunityEvent { .. } => CommunityKind::CommunityEvent,
            PlacementKind::Lab => CommunityKind::Lab,
        }
    }

    pub fn is_event(self) -> bool {
        self.community_kind().is_event()
    }
}

/// The shared community columns the club rules look at, taken either from a
/// stored row or from a payload that has not been inserted yet.
#[derive(Debug, Clone, Copy)]
pub struct Exposure<'a> {
    pub url_id: Option<&'a str>,
    pub is_publicly_visible: bool,
}

impl<'a> From<&'a Community> for Exposure<'a> {
    fn from(community: &'a Community) -> Self {
        Exposure {
            url_id: community.url_id.as_deref(),
            is_publicly_visible: community.is_publicly_visible,
        }
    }
}

/// Unofficial clubs may not occupy a room, claim a custom URL id, or be
/// publicly visible.
pub fn check_club(community: Exposure, club: &Club) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    if !club.is_official {
        if club.room.is_some() {
            errors.push(
                "Unofficial clubs are not able to occupy a room.",
                UNOFFICIAL_CLUB_LIMITATIONS,
            );
        }
        if community.url_id.is_some() {
            errors.push(
                "Unofficial clubs are not able to set custom URL ID.",
                UNOFFICIAL_CLUB_LIMITATIONS,
            );
        }
        if community.is_publicly_visible {
            errors.push(
                "Unofficial clubs cannot be publicly visible.",
                UNOFFICIAL_CLUB_LIMITATIONS,
            );
        }
    }

    errors.into_result()
}

pub fn check_event(event: &Event) -> Result<(), ValidationErrors> {
    check_period(event.start_date, Some(event.end_date))
}

/// A period may be open-ended; a closed one must not end before it starts.
pub fn check_period(start: NaiveDate, end: Option<NaiveDate>) -> Result<(), ValidationErrors> {
    match end {
        Some(end) if start > end => Err(ValidationErrors::single(
            "Start date must come before the end date.",
            DATE_PERIOD_ERROR,
        )),
        _ => Ok(()),
    }
}

/// Community events carry the event rules plus their own: they live under
/// a non-event community, an official one if it is a club, and are always
/// approved.
pub fn check_community_event(
    event: &Event,
    created_under: &Placement,
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    if let Err(e) = check_event(event) {
        errors.extend(e);
    }

    match created_under.kind {
        kind if kind.is_event() => errors.push(
            "Community events are not able to be created under events.",
            HIERARCHY_ERROR,
        ),
        PlacementKind::Club { is_official: false } => errors.push(
            "Community events are not able to be created under unofficial clubs.",
            UNOFFICIAL_CLUB_LIMITATIONS,
        ),
        _ => {}
    }

    if !event.is_approved {
        errors.push(
            "Community events are not able to be unapproved.",
            STATUS_ERROR,
        );
    }

    errors.into_result()
}

/// `community` owns the album; `linked` is the community event it points at.
pub fn check_album(
    community: &Placement,
    linked: Option<&Placement>,
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    if let PlacementKind::CommunityEvent { .. } = community.kind {
        errors.push(
            "Albums are not able to be created under community events.",
            HIERARCHY_ERROR,
        );
    }

    if let Some(linked) = linked {
        if community.kind.is_event() {
            errors.push(
                "Albums are not able to be linked to community events if created under an event.",
                HIERARCHY_ERROR,
            );
        }

        match linked.kind {
            PlacementKind::CommunityEvent { created_under } if created_under != community.id => {
                errors.push(
                    "Albums are not able to be linked to community events created under other communities.",
                    HIERARCHY_ERROR,
                )
            }
            PlacementKind::CommunityEvent { .. } => {}
            _ => errors.push(
                "Albums are only able to be linked to community events.",
                HIERARCHY_ERROR,
            ),
        }
    }

    errors.into_result()
}

pub fn check_comment_target(target: &Placement) -> Result<(), ValidationErrors> {
    if target.kind.is_event() {
        Ok(())
    } else {
        Err(ValidationErrors::single(
            "Comments are only able to be written under events.",
            HIERARCHY_ERROR,
        ))
    }
}

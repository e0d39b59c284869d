//! Join requests, invitations and memberships: who may move them and where.

use crate::{
    models::{ApprovalStatus, EndReason, Invitation, Membership, Request},
    validation::ValidationErrors,
};
use thiserror::Error;

/// Position of a member within a community, stored as an integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Rank {
    Member = 0,
    Staff = 1,
    Deputy = 2,
    Head = 3,
}

impl Rank {
    pub fn from_position(position: i32) -> Option<Rank> {
        match position {
            0 => Some(Rank::Member),
            1 => Some(Rank::Staff),
            2 => Some(Rank::Deputy),
            3 => Some(Rank::Head),
            _ => None,
        }
    }

    pub fn position(self) -> i32 {
        self as i32
    }

    pub fn is_staff(self) -> bool {
        self >= Rank::Staff
    }
}

/// Rank of an actor within one community, `None` when not an active member.
pub fn is_staff(rank: Option<Rank>) -> bool {
    rank.map_or(false, Rank::is_staff)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Request statuses are not able to be updated to waiting.")]
    BackToWaiting,
    #[error("Only waiting requests are able to be updated.")]
    AlreadyResolved,
}

/// Outcome of answering a request or invitation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub status: ApprovalStatus,
    /// An accepted answer creates a rank 0 membership.
    pub grants_membership: bool,
}

/// Waiting moves to Accepted or Declined once; nothing moves back to Waiting.
pub fn transition(
    current: ApprovalStatus,
    next: ApprovalStatus,
) -> Result<Transition, TransitionError> {
    if next == ApprovalStatus::Waiting {
        return Err(TransitionError::BackToWaiting);
    }
    if current != ApprovalStatus::Waiting {
        return Err(TransitionError::AlreadyResolved);
    }

    Ok(Transition {
        status: next,
        grants_membership: next == ApprovalStatus::Accepted,
    })
}

pub const NOT_ACCEPTING_REQUESTS: &str = "not_accepting_requests";
pub const MEMBERSHIP_EXISTS: &str = "membership_exists";
pub const REQUEST_EXISTS: &str = "request_exists";
pub const INVITATION_EXISTS: &str = "invitation_exists";

/// What is already known about a user and a community before a new
/// request or invitation is recorded.
#[derive(Debug, Clone, Copy, Default)]
pub struct Standing {
    pub is_active_member: bool,
    pub has_waiting_request: bool,
    pub has_waiting_invitation: bool,
}

pub fn check_new_request(
    is_accepting_requests: bool,
    standing: Standing,
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    if !is_accepting_requests {
        errors.push(
            "The community is not accepting requests.",
            NOT_ACCEPTING_REQUESTS,
        );
    }
    if standing.is_active_member {
        errors.push("The user is already a member of the community.", MEMBERSHIP_EXISTS);
    }
    if standing.has_waiting_request {
        errors.push(
            "The user already has a waiting request to the community.",
            REQUEST_EXISTS,
        );
    }

    errors.into_result()
}

/// Partial unique indexes that back the standing checks when two writes race.
pub const ACTIVE_MEMBERSHIP_INDEX: &str = "memberships_active_idx";
pub const WAITING_REQUEST_INDEX: &str = "requests_waiting_idx";
pub const WAITING_INVITATION_INDEX: &str = "invitations_waiting_idx";

/// The user-facing violation for a unique index guarding a workflow rule.
pub fn constraint_violation(constraint: &str) -> Option<ValidationErrors> {
    let (message, code) = match constraint {
        ACTIVE_MEMBERSHIP_INDEX => ("The user is already a member of the community.", MEMBERSHIP_EXISTS),
        WAITING_REQUEST_INDEX => (
            "The user already has a waiting request to the community.",
            REQUEST_EXISTS,
        ),
        WAITING_INVITATION_INDEX => (
            "The user already has a waiting invitation to the community.",
            INVITATION_EXISTS,
        ),
        _ => return None,
    };
    Some(ValidationErrors::single(message, code))
}

pub fn check_new_invitation(standing: Standing) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    if standing.is_active_member {
        errors.push("The user is already a member of the community.", MEMBERSHIP_EXISTS);
    }
    if standing.has_waiting_invitation {
        errors.push(
            "The user already has a waiting invitation to the community.",
            INVITATION_EXISTS,
        );
    }

    errors.into_result()
}

pub fn can_view_request(actor: i32, actor_rank: Option<Rank>, request: &Request) -> bool {
    request.user_id == actor || actor_rank.is_some()
}

/// Only staff of the target community answer requests.
pub fn can_answer_request(actor_rank: Option<Rank>) -> bool {
    is_staff(actor_rank)
}

/// Requesters withdraw their own requests while those are still waiting.
pub fn can_cancel_request(actor: i32, request: &Request) -> bool {
    request.user_id == actor && request.status == ApprovalStatus::Waiting
}

pub fn can_view_invitation(actor: i32, actor_rank: Option<Rank>, invitation: &Invitation) -> bool {
    invitation.invitee_id == actor || invitation.invitor_id == actor || is_staff(actor_rank)
}

pub fn can_answer_invitation(actor: i32, invitation: &Invitation) -> bool {
    invitation.invitee_id == actor
}

pub fn can_cancel_invitation(actor: i32, invitation: &Invitation) -> bool {
    invitation.invitor_id == actor && invitation.status == ApprovalStatus::Waiting
}

/// The actor must outrank both the member's current rank and the new one.
pub fn can_change_position(actor_rank: Option<Rank>, current: Rank, new: Rank) -> bool {
    match actor_rank {
        Some(actor) => actor.is_staff() && actor > current && actor > new,
        None => false,
    }
}

/// Members leave on their own; staff remove members they outrank.
pub fn end_reason(actor: i32, actor_rank: Option<Rank>, membership: &Membership) -> Option<EndReason> {
    if !membership.is_active() {
        return None;
    }
    if membership.user_id == actor {
        return Some(EndReason::Left);
    }

    let member_rank = Rank::from_position(membership.position)?;
    match actor_rank {
        Some(actor) if actor.is_staff() && actor > member_rank => Some(EndReason::Removed),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn stamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2022, 6, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn request(user_id: i32, status: ApprovalStatus) -> Request {
        Request {
            id: 1,
            user_id,
            community_id: 7,
            status,
            created_at: stamp(),
            updated_at: stamp(),
            updated_by: Some(user_id),
        }
    }

    fn invitation(invitor_id: i32, invitee_id: i32, status: ApprovalStatus) -> Invitation {
        Invitation {
            id: 1,
            community_id: 7,
            invitor_id,
            invitee_id,
            invited_at: stamp(),
            status,
        }
    }

    fn membership(user_id: i32, rank: Rank) -> Membership {
        Membership {
            id: 1,
            user_id,
            community_id: 7,
            position: rank.position(),
            start_date: stamp().date(),
            end_date: None,
            end_reason: None,
            created_at: stamp(),
            updated_at: stamp(),
            created_by: None,
            updated_by: None,
        }
    }

    #[test]
    fn accepting_a_waiting_request_grants_membership() {
        let t = transition(ApprovalStatus::Waiting, ApprovalStatus::Accepted).unwrap();
        assert_eq!(t.status, ApprovalStatus::Accepted);
        assert!(t.grants_membership);
    }

    #[test]
    fn declining_grants_nothing() {
        let t = transition(ApprovalStatus::Waiting, ApprovalStatus::Declined).unwrap();
        assert!(!t.grants_membership);
    }

    #[test]
    fn nothing_returns_to_waiting() {
        for current in [
            ApprovalStatus::Waiting,
            ApprovalStatus::Accepted,
            ApprovalStatus::Declined,
        ] {
            assert_eq!(
                transition(current, ApprovalStatus::Waiting),
                Err(TransitionError::BackToWaiting)
            );
        }
    }

    #[test]
    fn resolved_requests_are_terminal() {
        assert_eq!(
            transition(ApprovalStatus::Accepted, ApprovalStatus::Declined),
            Err(TransitionError::AlreadyResolved)
        );
        assert_eq!(
            transition(ApprovalStatus::Declined, ApprovalStatus::Accepted),
            Err(TransitionError::AlreadyResolved)
        );
    }

    #[test]
    fn only_staff_answer_requests() {
        assert!(!can_answer_request(None));
        assert!(!can_answer_request(Some(Rank::Member)));
        assert!(can_answer_request(Some(Rank::Staff)));
        assert!(can_answer_request(Some(Rank::Head)));
    }

    #[test]
    fn only_the_owner_cancels_a_waiting_request() {
        assert!(can_cancel_request(3, &request(3, ApprovalStatus::Waiting)));
        assert!(!can_cancel_request(4, &request(3, ApprovalStatus::Waiting)));
        assert!(!can_cancel_request(3, &request(3, ApprovalStatus::Accepted)));
        assert!(!can_cancel_request(3, &request(3, ApprovalStatus::Declined)));
    }

    #[test]
    fn members_and_owners_see_requests() {
        let r = request(3, ApprovalStatus::Waiting);
        assert!(can_view_request(3, None, &r));
        assert!(can_view_request(9, Some(Rank::Member), &r));
        assert!(!can_view_request(9, None, &r));
    }

    #[test]
    fn new_request_collects_every_reason() {
        let errors = check_new_request(
            false,
            Standing {
                is_active_member: true,
                has_waiting_request: true,
                has_waiting_invitation: false,
            },
        )
        .unwrap_err();

        assert!(errors.has_code(NOT_ACCEPTING_REQUESTS));
        assert!(errors.has_code(MEMBERSHIP_EXISTS));
        assert!(errors.has_code(REQUEST_EXISTS));
        assert!(check_new_request(true, Standing::default()).is_ok());
    }

    #[test]
    fn duplicate_invitation_is_rejected() {
        let standing = Standing {
            has_waiting_invitation: true,
            ..Standing::default()
        };
        assert!(check_new_invitation(standing)
            .unwrap_err()
            .has_code(INVITATION_EXISTS));
    }

    #[test]
    fn invitation_roles() {
        let waiting = invitation(1, 2, ApprovalStatus::Waiting);
        assert!(can_answer_invitation(2, &waiting));
        assert!(!can_answer_invitation(1, &waiting));
        assert!(can_cancel_invitation(1, &waiting));
        assert!(!can_cancel_invitation(2, &waiting));
        assert!(!can_cancel_invitation(1, &invitation(1, 2, ApprovalStatus::Declined)));
        assert!(can_view_invitation(5, Some(Rank::Staff), &waiting));
        assert!(!can_view_invitation(5, Some(Rank::Member), &waiting));
    }

    #[test]
    fn position_changes_need_a_higher_rank() {
        assert!(can_change_position(Some(Rank::Head), Rank::Member, Rank::Deputy));
        assert!(!can_change_position(Some(Rank::Head), Rank::Member, Rank::Head));
        assert!(!can_change_position(Some(Rank::Staff), Rank::Member, Rank::Staff));
        assert!(can_change_position(Some(Rank::Deputy), Rank::Staff, Rank::Member));
        assert!(!can_change_position(Some(Rank::Deputy), Rank::Deputy, Rank::Member));
        assert!(!can_change_position(None, Rank::Member, Rank::Member));
    }

    #[test]
    fn ending_a_membership() {
        let m = membership(4, Rank::Staff);
        assert_eq!(end_reason(4, Some(Rank::Staff), &m), Some(EndReason::Left));
        assert_eq!(end_reason(1, Some(Rank::Head), &m), Some(EndReason::Removed));
        assert_eq!(end_reason(1, Some(Rank::Staff), &m), None);
        assert_eq!(end_reason(1, None, &m), None);

        let ended = Membership {
            end_date: Some(stamp().date()),
            end_reason: Some(EndReason::Left),
            ..m
        };
        assert_eq!(end_reason(4, Some(Rank::Staff), &ended), None);
    }

    #[test]
    fn rank_positions() {
        assert_eq!(Rank::from_position(3), Some(Rank::Head));
        assert_eq!(Rank::from_position(4), None);
        assert_eq!(Rank::Deputy.position(), 2);
        assert!(!Rank::Member.is_staff());
    }
}

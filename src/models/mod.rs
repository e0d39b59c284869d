use diesel::{
    deserialize::{self, FromSql},
    pg::{Pg, PgValue},
    serialize::{self, Output, ToSql},
    sql_types::Text,
};
use serde::{Deserialize, Serialize};

mod asset;
mod category;
mod community;
mod membership;

pub use asset::*;
pub use category::*;
pub use community::*;
pub use membership::*;

/// Declares an enum persisted as a one-letter text code.
macro_rules! coded_enum {
    ($(#[$meta:meta])* $name:ident, $what:literal { $($variant:ident => $code:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            Serialize,
            Deserialize,
            diesel::AsExpression,
            diesel::FromSqlRow,
        )]
        #[diesel(sql_type = Text)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn code(self) -> &'static str {
                match self {
                    $(Self::$variant => $code),+
                }
            }

            pub fn from_code(code: &str) -> Option<Self> {
                match code {
                    $($code => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }

        impl ToSql<Text, Pg> for $name {
            fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
                <str as ToSql<Text, Pg>>::to_sql(self.code(), out)
            }
        }

        impl FromSql<Text, Pg> for $name {
            fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
                let code = <String as FromSql<Text, Pg>>::from_sql(bytes)?;
                Self::from_code(&code)
                    .ok_or_else(|| format!("unrecognized {} `{}`", $what, code).into())
            }
        }
    };
}

coded_enum! {
    /// Discriminator recorded on every community row.
    CommunityKind, "community kind" {
        Club => "C",
        Event => "E",
        CommunityEvent => "X",
        Lab => "L",
    }
}

coded_enum! {
    /// Operating status shared by clubs and labs.
    OperationStatus, "operation status" {
        Recruiting => "R",
        Closed => "C",
        Disbanded => "D",
    }
}

coded_enum! {
    /// Lifecycle of join requests and invitations.
    ApprovalStatus, "approval status" {
        Waiting => "W",
        Accepted => "A",
        Declined => "D",
    }
}

coded_enum! {
    EndReason, "membership end reason" {
        Left => "L",
        Removed => "R",
    }
}

impl CommunityKind {
    /// Community events are events too.
    pub fn is_event(self) -> bool {
        matches!(self, CommunityKind::Event | CommunityKind::CommunityEvent)
    }
}

impl Default for OperationStatus {
    fn default() -> Self {
        OperationStatus::Recruiting
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_stored_values() {
        assert_eq!(CommunityKind::CommunityEvent.code(), "X");
        assert_eq!(ApprovalStatus::from_code("D"), Some(ApprovalStatus::Declined));
        assert_eq!(ApprovalStatus::from_code("Z"), None);
        assert_eq!(EndReason::from_code("R"), Some(EndReason::Removed));
    }

    #[test]
    fn community_events_count_as_events() {
        assert!(CommunityKind::Event.is_event());
        assert!(CommunityKind::CommunityEvent.is_event());
        assert!(!CommunityKind::Club.is_event());
        assert!(!CommunityKind::Lab.is_event());
    }
}

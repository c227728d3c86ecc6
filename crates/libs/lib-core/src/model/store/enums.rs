//! # Stored Enumerations
//!
//! Status and role columns are stored as lowercase text. Every enum here parses
//! case-insensitively and serializes to the same text on the wire.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Text that does not name a variant of the target enum.
#[derive(Debug, Clone, Error)]
#[error("Invalid {kind}: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    _ => Err(ParseEnumError { kind: stringify!($name), value: s.to_string() }),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = ParseEnumError;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                s.parse()
            }
        }
    };
}

text_enum! {
    /// Account role. Admin, government and NGO accounts are "staff".
    Role {
        Admin => "admin",
        Government => "government",
        Ngo => "ngo",
        Vendor => "vendor",
        Beneficiary => "beneficiary",
        Donor => "donor",
    }
}

impl Role {
    pub const STAFF: &'static [Role] = &[Role::Admin, Role::Government, Role::Ngo];

    pub fn is_staff(&self) -> bool {
        Self::STAFF.contains(self)
    }

    /// Roles a user may pick when registering themselves.
    pub fn is_self_assignable(&self) -> bool {
        matches!(self, Role::Beneficiary | Role::Donor | Role::Vendor)
    }
}

text_enum! {
    DisasterSeverity {
        Low => "low",
        Medium => "medium",
        High => "high",
        Critical => "critical",
    }
}

text_enum! {
    DisasterStatus {
        Active => "active",
        Resolved => "resolved",
        Archived => "archived",
    }
}

text_enum! {
    VendorStatus {
        Pending => "pending",
        Approved => "approved",
        Suspended => "suspended",
    }
}

text_enum! {
    VoucherStatus {
        Active => "active",
        Used => "used",
        Expired => "expired",
        Revoked => "revoked",
    }
}

text_enum! {
    TransactionStatus {
        Pending => "pending",
        Confirmed => "confirmed",
        Failed => "failed",
        Flagged => "flagged",
    }
}

impl TransactionStatus {
    /// Allowed manual status changes. `Failed` is terminal.
    pub fn can_transition_to(&self, next: TransactionStatus) -> bool {
        use TransactionStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed | Failed | Flagged)
                | (Confirmed, Flagged)
                | (Flagged, Confirmed | Failed)
        )
    }
}

text_enum! {
    ProofStatus {
        Pending => "pending",
        Verified => "verified",
        Rejected => "rejected",
    }
}

text_enum! {
    NotificationChannel {
        InApp => "in_app",
        Email => "email",
        Sms => "sms",
    }
}

text_enum! {
    JobStatus {
        Pending => "pending",
        Processing => "processing",
        Completed => "completed",
        Failed => "failed",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("NGO".parse::<Role>().unwrap(), Role::Ngo);
        assert_eq!(" Critical ".parse::<DisasterSeverity>().unwrap(), DisasterSeverity::Critical);
        assert_eq!("in_app".parse::<NotificationChannel>().unwrap(), NotificationChannel::InApp);
    }

    #[test]
    fn test_parse_error_names_kind() {
        let err = "superuser".parse::<Role>().unwrap_err();
        assert_eq!(err.to_string(), "Invalid Role: superuser");
    }

    #[test]
    fn test_serde_matches_text() {
        for channel in NotificationChannel::ALL {
            let json = serde_json::to_string(channel).unwrap();
            assert_eq!(json, format!("\"{}\"", channel.as_str()));
        }
    }

    #[test]
    fn test_staff_roles() {
        assert!(Role::Government.is_staff());
        assert!(!Role::Vendor.is_staff());
        assert!(!Role::Admin.is_self_assignable());
        assert!(Role::Donor.is_self_assignable());
    }

    #[test]
    fn test_transaction_transitions() {
        use TransactionStatus::*;
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Confirmed.can_transition_to(Flagged));
        assert!(Flagged.can_transition_to(Failed));
        assert!(!Confirmed.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Confirmed));
        assert!(!Confirmed.can_transition_to(Confirmed));
    }
}

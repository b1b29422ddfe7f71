use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(TaskPriority {
    High => "high",
    Normal => "normal",
    Low => "low",
});

str_enum!(TaskStatus {
    Open => "open",
    Completed => "completed",
    Cancelled => "cancelled",
});

str_enum!(MilestoneStatus {
    Pending => "pending",
    InProgress => "in_progress",
    Completed => "completed",
});

str_enum!(PaymentStatus {
    Pending => "pending",
    Partial => "partial",
    Paid => "paid",
});

str_enum!(PredeterminationStatus {
    NotSent => "not_sent",
    Sent => "sent",
    Approved => "approved",
    Denied => "denied",
});

str_enum!(DentureType {
    Full => "full",
    Partial => "partial",
    Immediate => "immediate",
    Implant => "implant",
});

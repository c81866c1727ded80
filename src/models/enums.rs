use serde::{Deserialize, Serialize};

/// A string did not name any variant of the target enum.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid {field} value: {value:?}")]
pub struct InvalidEnum {
    pub field: String,
    pub value: String,
}

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$(Self::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.pad(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = InvalidEnum;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

// Role strings are the ones the identity collaborator hands out.
str_enum!(Role {
    Patient => "Patient",
    Doctor => "Doctor",
    Specialist => "Specialist",
    Radiologist => "Radiologist",
    Receptionist => "Receptionist",
});

str_enum!(NotificationCategory {
    Message => "message",
    Recommendation => "recommendation",
    Request => "request",
    Information => "information",
    Appointment => "appointment",
    Unclassified => "unclassified",
});

str_enum!(NotificationIcon {
    Message => "message",
    Calendar => "calendar",
    Activity => "activity",
    Bell => "bell",
});

str_enum!(Filter {
    All => "all",
    Unread => "unread",
    Read => "read",
});

str_enum!(UploadStatus {
    Idle => "idle",
    Ready => "ready",
    Submitting => "submitting",
    Succeeded => "succeeded",
    Failed => "failed",
});

str_enum!(SeverityTier {
    Success => "success",
    Destructive => "destructive",
    Warning => "warning",
    Info => "info",
    Secondary => "secondary",
});

impl Default for Filter {
    fn default() -> Self {
        Self::All
    }
}

impl Filter {
    /// Whether an item with the given read flag is visible under this filter.
    pub fn admits(&self, read: bool) -> bool {
        match self {
            Self::All => true,
            Self::Unread => !read,
            Self::Read => read,
        }
    }
}

impl Role {
    /// Lenient parse for role strings coming from outside the crate.
    ///
    /// Unknown roles are not an error: callers fall back to the default
    /// notification source and resolve no role-specific links.
    pub fn parse_lenient(s: &str) -> Option<Self> {
        let trimmed = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|r| r.as_str().eq_ignore_ascii_case(trimmed))
    }
}

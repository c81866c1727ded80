//! Role → notification collection table.
//!
//! Fetch and mutate always target the same collection, so a fallback can
//! never pair one role's list with another role's read-state endpoint.

use serde::Serialize;

use crate::models::{NotificationId, Role};

/// Where a role's notifications live on the imaging API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Collection {
    /// Collection path under the API base, without slashes at either end.
    pub path: &'static str,
    /// Query parameter that scopes the list to one user.
    pub user_param: &'static str,
}

const PATIENT: Collection = Collection {
    path: "detection/doctorpatientmessagenotification",
    user_param: "patient_id",
};
const DOCTOR: Collection = Collection {
    path: "detection/specialistdoctornotifications",
    user_param: "doctor_id",
};
const SPECIALIST: Collection = Collection {
    path: "detection/doctorspecialistnotifications",
    user_param: "specialist_id",
};
const RADIOLOGIST: Collection = Collection {
    path: "detection/doctorradiologistnotifications",
    user_param: "radiologist_id",
};
/// Used for roles without a dedicated feed and for unrecognized roles.
const FALLBACK: Collection = Collection {
    path: "detection/notifications",
    user_param: "doctor_id",
};

/// Dedicated collection per role; `None` means the role uses the fallback.
fn collection_for(role: Role) -> Option<Collection> {
    match role {
        Role::Patient => Some(PATIENT),
        Role::Doctor => Some(DOCTOR),
        Role::Specialist => Some(SPECIALIST),
        Role::Radiologist => Some(RADIOLOGIST),
        Role::Receptionist => None,
    }
}

/// List request for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchTarget {
    pub collection: Collection,
    pub user_id: String,
}

impl FetchTarget {
    /// Path relative to the API base, with the trailing slash the API expects.
    pub fn path(&self) -> String {
        format!("{}/", self.collection.path)
    }

    pub fn query(&self) -> [(&'static str, &str); 1] {
        [(self.collection.user_param, self.user_id.as_str())]
    }
}

/// Read-state update destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MutateTarget {
    pub collection: Collection,
}

impl MutateTarget {
    pub fn item_path(&self, id: NotificationId) -> String {
        format!("{}/{id}/", self.collection.path)
    }
}

/// Resolved fetch/mutate pair for one (role, user).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationEndpoints {
    pub fetch: FetchTarget,
    pub mutate: MutateTarget,
    /// True when the role had no dedicated collection.
    pub degraded: bool,
}

/// Resolve the notification endpoints for a role and user.
///
/// Deterministic. Unknown or feed-less roles get the fallback pair, which is
/// logged but is not an error.
pub fn resolve(role: Option<Role>, user_id: &str) -> NotificationEndpoints {
    let dedicated = role.and_then(collection_for);
    let degraded = dedicated.is_none();
    let collection = dedicated.unwrap_or(FALLBACK);

    if degraded {
        tracing::warn!(
            role = role.map(|r| r.as_str()).unwrap_or("unknown"),
            collection = collection.path,
            "No dedicated notification feed for role, using fallback"
        );
    }

    NotificationEndpoints {
        fetch: FetchTarget {
            collection,
            user_id: user_id.to_string(),
        },
        mutate: MutateTarget { collection },
        degraded,
    }
}

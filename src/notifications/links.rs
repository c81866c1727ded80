//! Deep-link table for notifications.

use crate::models::{NotificationCategory, Role};

/// Detail-view route prefix for a (category, role) pair, if any.
fn route_prefix(category: NotificationCategory, role: Option<Role>) -> Option<&'static str> {
    match category {
        NotificationCategory::Message => match role? {
            Role::Patient => Some("/doctorpatientdetail"),
            Role::Doctor => Some("/specialistdoctorresponsedetail"),
            Role::Specialist | Role::Radiologist | Role::Receptionist => None,
        },
        NotificationCategory::Recommendation => Some("/specialistdoctorrecommendationdetail"),
        NotificationCategory::Request => Some("/doctorspecialistrequestdetail"),
        NotificationCategory::Information => Some("/radiologistdoctordetail"),
        NotificationCategory::Appointment => Some("/appointments"),
        NotificationCategory::Unclassified => None,
    }
}

/// Resolve the navigation target for a notification.
///
/// `None` means "render without navigation": an empty reference id, or a
/// pair with no table entry.
pub fn resolve(role: Option<Role>, category: NotificationCategory, ref_id: &str) -> Option<String> {
    if ref_id.is_empty() {
        return None;
    }
    route_prefix(category, role).map(|prefix| format!("{prefix}/{ref_id}"))
}

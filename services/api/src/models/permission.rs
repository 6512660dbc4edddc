//! Admin capability flags

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-admin capability toggles. Every flag defaults to `false`, so an
/// admin without a stored row can manage nothing beyond plain reads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionFlags {
    pub manage_users: bool,
    pub manage_subjects: bool,
    pub manage_materials: bool,
    pub manage_gallery: bool,
    pub manage_timetable: bool,
    pub manage_reports: bool,
    pub manage_chat: bool,
    pub manage_assessments: bool,
    pub manage_results: bool,
    pub manage_activities: bool,
    pub view_doctor_dashboard: bool,
}

/// Admin account joined with its stored flags (or the defaults when no
/// row exists yet)
#[derive(Debug, Clone, Serialize)]
pub struct AdminWithPermissions {
    pub id: Uuid,
    pub user_code: String,
    pub full_name: String,
    pub email: String,
    pub course_id: Option<Uuid>,
    pub permissions: PermissionFlags,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_default_to_denied() {
        let flags = PermissionFlags::default();
        assert!(!flags.manage_users);
        assert!(!flags.manage_chat);
        assert!(!flags.view_doctor_dashboard);
    }

    #[test]
    fn partial_payload_fills_missing_flags_with_false() {
        let flags: PermissionFlags =
            serde_json::from_str(r#"{"manage_subjects": true}"#).unwrap();
        assert!(flags.manage_subjects);
        assert!(!flags.manage_users);
        assert!(!flags.manage_results);
    }
}

//! Admin permission store

use anyhow::Result;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::permission::{AdminWithPermissions, PermissionFlags};

const FLAG_COLUMNS: &str = "manage_users, manage_subjects, manage_materials, manage_gallery, \
     manage_timetable, manage_reports, manage_chat, manage_assessments, \
     manage_results, manage_activities, view_doctor_dashboard";

/// Permission repository for database operations
#[derive(Clone)]
pub struct PermissionRepository {
    pool: PgPool,
}

impl PermissionRepository {
    /// Create a new permission repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Stored flags for one admin, `None` when no row exists yet
    pub async fn get(&self, admin_id: Uuid) -> Result<Option<PermissionFlags>> {
        let row = sqlx::query(&format!(
            "SELECT {FLAG_COLUMNS} FROM admin_permissions WHERE admin_id = $1"
        ))
        .bind(admin_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| map_flags(&row)))
    }

    /// Creates or replaces the flag row for one admin
    pub async fn upsert(&self, admin_id: Uuid, flags: &PermissionFlags) -> Result<PermissionFlags> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO admin_permissions (
                admin_id, manage_users, manage_subjects, manage_materials, manage_gallery,
                manage_timetable, manage_reports, manage_chat, manage_assessments,
                manage_results, manage_activities, view_doctor_dashboard
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (admin_id) DO UPDATE SET
                manage_users = EXCLUDED.manage_users,
                manage_subjects = EXCLUDED.manage_subjects,
                manage_materials = EXCLUDED.manage_materials,
                manage_gallery = EXCLUDED.manage_gallery,
                manage_timetable = EXCLUDED.manage_timetable,
                manage_reports = EXCLUDED.manage_reports,
                manage_chat = EXCLUDED.manage_chat,
                manage_assessments = EXCLUDED.manage_assessments,
                manage_results = EXCLUDED.manage_results,
                manage_activities = EXCLUDED.manage_activities,
                view_doctor_dashboard = EXCLUDED.view_doctor_dashboard,
                updated_at = now()
            RETURNING {FLAG_COLUMNS}
            "#
        ))
        .bind(admin_id)
        .bind(flags.manage_users)
        .bind(flags.manage_subjects)
        .bind(flags.manage_materials)
        .bind(flags.manage_gallery)
        .bind(flags.manage_timetable)
        .bind(flags.manage_reports)
        .bind(flags.manage_chat)
        .bind(flags.manage_assessments)
        .bind(flags.manage_results)
        .bind(flags.manage_activities)
        .bind(flags.view_doctor_dashboard)
        .fetch_one(&self.pool)
        .await?;

        Ok(map_flags(&row))
    }

    /// All admins with their effective flags; admins without a stored
    /// row come back with everything denied
    pub async fn list_admins_with_flags(&self) -> Result<Vec<AdminWithPermissions>> {
        let rows = sqlx::query(
            r#"
            SELECT u.id, u.user_code, u.full_name, u.email, u.course_id,
                   COALESCE(p.manage_users, false) AS manage_users,
                   COALESCE(p.manage_subjects, false) AS manage_subjects,
                   COALESCE(p.manage_materials, false) AS manage_materials,
                   COALESCE(p.manage_gallery, false) AS manage_gallery,
                   COALESCE(p.manage_timetable, false) AS manage_timetable,
                   COALESCE(p.manage_reports, false) AS manage_reports,
                   COALESCE(p.manage_chat, false) AS manage_chat,
                   COALESCE(p.manage_assessments, false) AS manage_assessments,
                   COALESCE(p.manage_results, false) AS manage_results,
                   COALESCE(p.manage_activities, false) AS manage_activities,
                   COALESCE(p.view_doctor_dashboard, false) AS view_doctor_dashboard
            FROM users u
            LEFT JOIN admin_permissions p ON p.admin_id = u.id
            WHERE u.role = 'admin'
            ORDER BY u.full_name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let admins = rows
            .into_iter()
            .map(|row| AdminWithPermissions {
                id: row.get("id"),
                user_code: row.get("user_code"),
                full_name: row.get("full_name"),
                email: row.get("email"),
                course_id: row.get("course_id"),
                permissions: map_flags(&row),
            })
            .collect();

        Ok(admins)
    }
}

fn map_flags(row: &sqlx::postgres::PgRow) -> PermissionFlags {
    PermissionFlags {
        manage_users: row.get("manage_users"),
        manage_subjects: row.get("manage_subjects"),
        manage_materials: row.get("manage_materials"),
        manage_gallery: row.get("manage_gallery"),
        manage_timetable: row.get("manage_timetable"),
        manage_reports: row.get("manage_reports"),
        manage_chat: row.get("manage_chat"),
        manage_assessments: row.get("manage_assessments"),
        manage_results: row.get("manage_results"),
        manage_activities: row.get("manage_activities"),
        view_doctor_dashboard: row.get("view_doctor_dashboard"),
    }
}

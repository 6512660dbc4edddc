//! Centralized authorization gate
//!
//! Every handler asks this module one question: may this actor perform
//! this action on this resource? The gate is a pure function over the
//! [`RequestContext`] and a description of the resource, so the policy
//! can be tested without a database.

use std::fmt;

use uuid::Uuid;

use crate::models::{Role, permission::PermissionFlags};
use crate::scope::{CourseScope, RequestContext};

/// What the caller wants to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    List,
    Read,
    Create,
    Update,
    Delete,
    Approve,
    Reject,
}

impl Action {
    fn is_mutation(&self) -> bool {
        !matches!(self, Action::List | Action::Read)
    }
}

/// Resource families the gate knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Course,
    UserAccount,
    AdminPermission,
    DisciplineIssue,
    MedicalRecord,
    Subject,
    Assessment,
    Grade,
    Material,
    GalleryItem,
    TimetableEntry,
    ChatMessage,
    Report,
    Activity,
    ExamResult,
    DoctorDashboard,
    Comment,
    Notification,
}

impl ResourceKind {
    /// Kinds that live inside a course and are subject to tenancy checks
    fn is_course_scoped(&self) -> bool {
        !matches!(
            self,
            ResourceKind::AdminPermission | ResourceKind::Comment | ResourceKind::Notification
        )
    }

    /// Kinds where editing stays with the author even when deletion
    /// does not
    fn is_authored(&self) -> bool {
        matches!(
            self,
            ResourceKind::Comment | ResourceKind::ChatMessage | ResourceKind::Grade
        )
    }

    fn plural_label(&self) -> &'static str {
        match self {
            ResourceKind::Course => "courses",
            ResourceKind::UserAccount => "users",
            ResourceKind::AdminPermission => "admin permissions",
            ResourceKind::DisciplineIssue => "discipline issues",
            ResourceKind::MedicalRecord => "medical records",
            ResourceKind::Subject => "subjects",
            ResourceKind::Assessment => "assessments",
            ResourceKind::Grade => "grades",
            ResourceKind::Material => "materials",
            ResourceKind::GalleryItem => "gallery items",
            ResourceKind::TimetableEntry => "timetable entries",
            ResourceKind::ChatMessage => "chat messages",
            ResourceKind::Report => "reports",
            ResourceKind::Activity => "activities",
            ResourceKind::ExamResult => "exam results",
            ResourceKind::DoctorDashboard => "the doctor dashboard",
            ResourceKind::Comment => "comments",
            ResourceKind::Notification => "notifications",
        }
    }
}

/// Description of the resource an action targets. For creation the
/// course is the one the new record would land in; for existing records
/// it is the course the row belongs to.
#[derive(Debug, Clone, Copy)]
pub struct ResourceScope {
    pub kind: ResourceKind,
    pub course_id: Option<Uuid>,
    pub owner_id: Option<Uuid>,
}

impl ResourceScope {
    pub fn of(kind: ResourceKind) -> Self {
        Self {
            kind,
            course_id: None,
            owner_id: None,
        }
    }

    pub fn in_course(mut self, course_id: impl Into<Option<Uuid>>) -> Self {
        self.course_id = course_id.into();
        self
    }

    pub fn owned_by(mut self, owner_id: impl Into<Option<Uuid>>) -> Self {
        self.owner_id = owner_id.into();
        self
    }
}

/// Refusal with a human-readable reason, surfaced to the client as 403
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deny {
    pub reason: String,
}

impl Deny {
    fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Deny {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

/// Decides whether `ctx` may perform `action` on `resource`.
///
/// Deny-by-default: list queries are always admitted (repositories narrow
/// them to the caller's scope), everything else must pass the role
/// policy, the course-scope check and, for admins, the capability flags.
pub fn authorize(
    ctx: &RequestContext,
    action: Action,
    resource: &ResourceScope,
) -> Result<(), Deny> {
    if ctx.actor.role == Role::Trainee {
        return Err(Deny::new("Trainee accounts have no access"));
    }

    // Read-state is personal. Not even a super admin marks someone
    // else's notification, and broadcasts have no recipient to act for.
    if resource.kind == ResourceKind::Notification
        && matches!(action, Action::Update | Action::Delete)
    {
        return if resource.owner_id == Some(ctx.actor.id) {
            Ok(())
        } else {
            Err(Deny::new(
                "Notifications can only be managed by their recipient",
            ))
        };
    }

    if ctx.actor.role == Role::SuperAdmin {
        return Ok(());
    }

    if resource.kind == ResourceKind::AdminPermission {
        return match (ctx.actor.role, action) {
            (Role::Admin, Action::Read) if resource.owner_id == Some(ctx.actor.id) => Ok(()),
            (Role::Admin, _) => Err(Deny::new("Only super admins can manage admin permissions")),
            _ => Err(Deny::new("Only admins have permissions")),
        };
    }

    if matches!(action, Action::Approve | Action::Reject) {
        return Err(Deny::new(
            "Only super admins can approve or reject discipline issues",
        ));
    }

    if resource.kind == ResourceKind::Course && action.is_mutation() {
        return Err(Deny::new("Only super admins can manage course metadata"));
    }

    // Lists are narrowed by the repositories, never rejected.
    if action == Action::List {
        return Ok(());
    }

    if resource.kind.is_course_scoped() {
        match ctx.scope {
            CourseScope::Unscoped => {}
            CourseScope::Course(own) => {
                if action == Action::Create {
                    if let Some(target) = resource.course_id {
                        if target != own {
                            return Err(Deny::new("Cannot create records outside your course"));
                        }
                    }
                } else if resource.course_id != Some(own) {
                    return Err(Deny::new(format!(
                        "This record is outside your course ({})",
                        resource.kind.plural_label()
                    )));
                }
            }
            CourseScope::Unassigned => {
                return Err(Deny::new("You must be assigned to a course"));
            }
        }
    }

    match ctx.actor.role {
        Role::Admin => authorize_admin(ctx, action, resource),
        Role::Instructor => authorize_instructor(ctx, action, resource),
        Role::Doctor => authorize_doctor(ctx, action, resource),
        Role::SuperAdmin => Ok(()),
        Role::Trainee => Err(Deny::new("Trainee accounts have no access")),
    }
}

/// Admins hold full CRUD inside their course, refined by capability
/// flags for the managed sub-resources.
fn authorize_admin(
    ctx: &RequestContext,
    action: Action,
    resource: &ResourceScope,
) -> Result<(), Deny> {
    if resource.kind == ResourceKind::DoctorDashboard && !ctx.permissions.view_doctor_dashboard {
        return Err(Deny::new(
            "You do not have permission to view the doctor dashboard",
        ));
    }

    if action.is_mutation() {
        if let Some(allowed) = manage_flag(&ctx.permissions, resource.kind) {
            if !allowed {
                return Err(Deny::new(format!(
                    "You do not have permission to manage {}",
                    resource.kind.plural_label()
                )));
            }
        }
        // Admins may delete authored records of others but never edit them.
        if resource.kind.is_authored()
            && action == Action::Update
            && resource.owner_id != Some(ctx.actor.id)
        {
            return Err(Deny::new("Only the author can edit this"));
        }
    }

    Ok(())
}

fn authorize_instructor(
    ctx: &RequestContext,
    action: Action,
    resource: &ResourceScope,
) -> Result<(), Deny> {
    match (resource.kind, action) {
        (ResourceKind::DoctorDashboard, _) => Err(Deny::new(
            "You do not have permission to view the doctor dashboard",
        )),
        (_, Action::Read) => Ok(()),
        (ResourceKind::Assessment | ResourceKind::Grade, Action::Create) => Ok(()),
        (ResourceKind::Assessment | ResourceKind::Grade, Action::Update | Action::Delete) => {
            require_author(
                ctx.actor.id,
                resource,
                "Instructors may only manage assessments and grades they authored",
            )
        }
        (ResourceKind::Comment, Action::Create) => Ok(()),
        (ResourceKind::Comment, Action::Update) => {
            require_author(ctx.actor.id, resource, "Only the author can edit this")
        }
        (ResourceKind::Comment, Action::Delete) => require_author(
            ctx.actor.id,
            resource,
            "Only the author or an admin can delete this",
        ),
        _ => Err(Deny::new(
            "Instructors may only manage their own assessments and grades",
        )),
    }
}

fn authorize_doctor(
    ctx: &RequestContext,
    action: Action,
    resource: &ResourceScope,
) -> Result<(), Deny> {
    match (resource.kind, action) {
        (_, Action::Read) => Ok(()),
        (ResourceKind::MedicalRecord, _) => Ok(()),
        (ResourceKind::Comment, Action::Create) => Ok(()),
        (ResourceKind::Comment, Action::Update) => {
            require_author(ctx.actor.id, resource, "Only the author can edit this")
        }
        (ResourceKind::Comment, Action::Delete) => require_author(
            ctx.actor.id,
            resource,
            "Only the author or an admin can delete this",
        ),
        _ => Err(Deny::new("Doctors may only manage medical records")),
    }
}

fn require_author(actor_id: Uuid, resource: &ResourceScope, reason: &str) -> Result<(), Deny> {
    if resource.owner_id == Some(actor_id) {
        Ok(())
    } else {
        Err(Deny::new(reason))
    }
}

/// Capability flag guarding mutations of the given kind, if any
fn manage_flag(flags: &PermissionFlags, kind: ResourceKind) -> Option<bool> {
    match kind {
        ResourceKind::UserAccount => Some(flags.manage_users),
        ResourceKind::Subject => Some(flags.manage_subjects),
        ResourceKind::Material => Some(flags.manage_materials),
        ResourceKind::GalleryItem => Some(flags.manage_gallery),
        ResourceKind::TimetableEntry => Some(flags.manage_timetable),
        ResourceKind::Report => Some(flags.manage_reports),
        ResourceKind::ChatMessage => Some(flags.manage_chat),
        ResourceKind::Assessment => Some(flags.manage_assessments),
        ResourceKind::ExamResult => Some(flags.manage_results),
        ResourceKind::Activity => Some(flags.manage_activities),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::AuthActor;

    fn ctx(role: Role, course_id: Option<Uuid>, permissions: PermissionFlags) -> RequestContext {
        RequestContext::new(
            AuthActor {
                id: Uuid::new_v4(),
                user_code: "TEST-001".to_string(),
                role,
                course_id,
            },
            permissions,
        )
    }

    fn deny_reason(result: Result<(), Deny>) -> String {
        result.unwrap_err().reason
    }

    #[test]
    fn trainees_are_denied_everything() {
        let course = Uuid::new_v4();
        let trainee = ctx(Role::Trainee, Some(course), PermissionFlags::default());
        let issue = ResourceScope::of(ResourceKind::DisciplineIssue).in_course(course);

        assert!(authorize(&trainee, Action::Read, &issue).is_err());
        assert!(authorize(&trainee, Action::List, &issue).is_err());
        assert_eq!(
            deny_reason(authorize(&trainee, Action::Create, &issue)),
            "Trainee accounts have no access"
        );
    }

    #[test]
    fn super_admin_crosses_course_boundaries() {
        let sa = ctx(Role::SuperAdmin, None, PermissionFlags::default());
        let issue = ResourceScope::of(ResourceKind::DisciplineIssue).in_course(Uuid::new_v4());

        assert!(authorize(&sa, Action::Read, &issue).is_ok());
        assert!(authorize(&sa, Action::Update, &issue).is_ok());
        assert!(authorize(&sa, Action::Delete, &issue).is_ok());
        assert!(authorize(&sa, Action::Approve, &issue).is_ok());
    }

    #[test]
    fn admins_stay_inside_their_course() {
        let own = Uuid::new_v4();
        let admin = ctx(Role::Admin, Some(own), PermissionFlags::default());

        let inside = ResourceScope::of(ResourceKind::DisciplineIssue).in_course(own);
        let outside = ResourceScope::of(ResourceKind::DisciplineIssue).in_course(Uuid::new_v4());

        assert!(authorize(&admin, Action::Read, &inside).is_ok());
        assert!(authorize(&admin, Action::Update, &inside).is_ok());
        assert!(authorize(&admin, Action::Read, &outside).is_err());
        assert!(authorize(&admin, Action::Delete, &outside).is_err());
        // Lists are narrowed, not refused.
        assert!(authorize(&admin, Action::List, &outside).is_ok());
    }

    #[test]
    fn unassigned_admin_cannot_create() {
        let admin = ctx(Role::Admin, None, PermissionFlags::default());
        let issue = ResourceScope::of(ResourceKind::DisciplineIssue);

        assert_eq!(
            deny_reason(authorize(&admin, Action::Create, &issue)),
            "You must be assigned to a course"
        );
    }

    #[test]
    fn capability_flags_default_to_deny() {
        let course = Uuid::new_v4();
        let admin = ctx(Role::Admin, Some(course), PermissionFlags::default());
        let subject = ResourceScope::of(ResourceKind::Subject).in_course(course);

        assert!(authorize(&admin, Action::Read, &subject).is_ok());
        assert_eq!(
            deny_reason(authorize(&admin, Action::Create, &subject)),
            "You do not have permission to manage subjects"
        );

        let granted = ctx(
            Role::Admin,
            Some(course),
            PermissionFlags {
                manage_subjects: true,
                ..PermissionFlags::default()
            },
        );
        assert!(authorize(&granted, Action::Create, &subject).is_ok());
        assert!(authorize(&granted, Action::Delete, &subject).is_ok());
    }

    #[test]
    fn discipline_issues_need_no_capability_flag() {
        let course = Uuid::new_v4();
        let admin = ctx(Role::Admin, Some(course), PermissionFlags::default());
        let issue = ResourceScope::of(ResourceKind::DisciplineIssue).in_course(course);

        assert!(authorize(&admin, Action::Create, &issue).is_ok());
        assert!(authorize(&admin, Action::Update, &issue).is_ok());
        assert!(authorize(&admin, Action::Delete, &issue).is_ok());
    }

    #[test]
    fn only_super_admins_approve_or_reject() {
        let course = Uuid::new_v4();
        let issue = ResourceScope::of(ResourceKind::DisciplineIssue).in_course(course);

        for role in [Role::Admin, Role::Instructor, Role::Doctor] {
            let caller = ctx(role, Some(course), PermissionFlags::default());
            assert_eq!(
                deny_reason(authorize(&caller, Action::Approve, &issue)),
                "Only super admins can approve or reject discipline issues"
            );
            assert!(authorize(&caller, Action::Reject, &issue).is_err());
        }
    }

    #[test]
    fn permission_store_is_super_admin_territory() {
        let sa = ctx(Role::SuperAdmin, None, PermissionFlags::default());
        let admin = ctx(Role::Admin, Some(Uuid::new_v4()), PermissionFlags::default());
        let doctor = ctx(Role::Doctor, Some(Uuid::new_v4()), PermissionFlags::default());

        let someone = ResourceScope::of(ResourceKind::AdminPermission).owned_by(Uuid::new_v4());
        let own = ResourceScope::of(ResourceKind::AdminPermission).owned_by(admin.actor.id);

        assert!(authorize(&sa, Action::Update, &someone).is_ok());
        assert!(authorize(&sa, Action::List, &someone).is_ok());

        assert!(authorize(&admin, Action::Read, &own).is_ok());
        assert_eq!(
            deny_reason(authorize(&admin, Action::Read, &someone)),
            "Only super admins can manage admin permissions"
        );
        assert!(authorize(&admin, Action::Update, &own).is_err());
        assert!(authorize(&admin, Action::List, &someone).is_err());

        let doctor_own = ResourceScope::of(ResourceKind::AdminPermission).owned_by(doctor.actor.id);
        assert_eq!(
            deny_reason(authorize(&doctor, Action::Read, &doctor_own)),
            "Only admins have permissions"
        );
    }

    #[test]
    fn course_metadata_is_super_admin_territory() {
        let course = Uuid::new_v4();
        let admin = ctx(Role::Admin, Some(course), PermissionFlags::default());
        let sa = ctx(Role::SuperAdmin, None, PermissionFlags::default());
        let resource = ResourceScope::of(ResourceKind::Course).in_course(course);

        assert!(authorize(&admin, Action::Read, &resource).is_ok());
        assert_eq!(
            deny_reason(authorize(&admin, Action::Update, &resource)),
            "Only super admins can manage course metadata"
        );
        assert!(authorize(&sa, Action::Update, &resource).is_ok());
    }

    #[test]
    fn notifications_belong_to_their_recipient() {
        let course = Uuid::new_v4();
        let admin = ctx(Role::Admin, Some(course), PermissionFlags::default());
        let sa = ctx(Role::SuperAdmin, None, PermissionFlags::default());

        let own = ResourceScope::of(ResourceKind::Notification).owned_by(admin.actor.id);
        let other = ResourceScope::of(ResourceKind::Notification).owned_by(Uuid::new_v4());
        let broadcast = ResourceScope::of(ResourceKind::Notification);

        assert!(authorize(&admin, Action::Update, &own).is_ok());
        assert!(authorize(&admin, Action::Delete, &own).is_ok());
        assert_eq!(
            deny_reason(authorize(&admin, Action::Update, &other)),
            "Notifications can only be managed by their recipient"
        );
        // Broadcasts have no recipient, so nobody marks or deletes them.
        assert!(authorize(&admin, Action::Delete, &broadcast).is_err());
        assert!(authorize(&sa, Action::Update, &other).is_err());
        assert!(authorize(&sa, Action::Delete, &broadcast).is_err());
    }

    #[test]
    fn instructors_manage_only_authored_assessments_and_grades() {
        let course = Uuid::new_v4();
        let instructor = ctx(Role::Instructor, Some(course), PermissionFlags::default());

        let own_grade = ResourceScope::of(ResourceKind::Grade)
            .in_course(course)
            .owned_by(instructor.actor.id);
        let other_grade = ResourceScope::of(ResourceKind::Grade)
            .in_course(course)
            .owned_by(Uuid::new_v4());
        let assessment = ResourceScope::of(ResourceKind::Assessment).in_course(course);

        assert!(authorize(&instructor, Action::Create, &assessment).is_ok());
        assert!(authorize(&instructor, Action::Update, &own_grade).is_ok());
        assert_eq!(
            deny_reason(authorize(&instructor, Action::Update, &other_grade)),
            "Instructors may only manage assessments and grades they authored"
        );
        assert!(authorize(&instructor, Action::Delete, &other_grade).is_err());

        let issue = ResourceScope::of(ResourceKind::DisciplineIssue).in_course(course);
        assert!(authorize(&instructor, Action::Read, &issue).is_ok());
        assert_eq!(
            deny_reason(authorize(&instructor, Action::Create, &issue)),
            "Instructors may only manage their own assessments and grades"
        );
    }

    #[test]
    fn doctors_manage_medical_records_within_their_course() {
        let course = Uuid::new_v4();
        let doctor = ctx(Role::Doctor, Some(course), PermissionFlags::default());

        let record = ResourceScope::of(ResourceKind::MedicalRecord).in_course(course);
        let foreign = ResourceScope::of(ResourceKind::MedicalRecord).in_course(Uuid::new_v4());
        let subject = ResourceScope::of(ResourceKind::Subject).in_course(course);

        assert!(authorize(&doctor, Action::Create, &record).is_ok());
        assert!(authorize(&doctor, Action::Update, &record).is_ok());
        assert!(authorize(&doctor, Action::Update, &foreign).is_err());
        assert_eq!(
            deny_reason(authorize(&doctor, Action::Create, &subject)),
            "Doctors may only manage medical records"
        );
    }

    #[test]
    fn authored_records_are_edited_by_authors_and_deleted_by_admins() {
        let course = Uuid::new_v4();
        let admin = ctx(Role::Admin, Some(course), PermissionFlags::default());
        let instructor = ctx(Role::Instructor, Some(course), PermissionFlags::default());

        let foreign_comment = ResourceScope::of(ResourceKind::Comment).owned_by(Uuid::new_v4());

        assert_eq!(
            deny_reason(authorize(&admin, Action::Update, &foreign_comment)),
            "Only the author can edit this"
        );
        assert!(authorize(&admin, Action::Delete, &foreign_comment).is_ok());
        assert_eq!(
            deny_reason(authorize(&instructor, Action::Delete, &foreign_comment)),
            "Only the author or an admin can delete this"
        );

        let own_comment = ResourceScope::of(ResourceKind::Comment).owned_by(instructor.actor.id);
        assert!(authorize(&instructor, Action::Update, &own_comment).is_ok());
        assert!(authorize(&instructor, Action::Delete, &own_comment).is_ok());
    }

    #[test]
    fn chat_mutations_respect_the_manage_chat_flag() {
        let course = Uuid::new_v4();
        let message = ResourceScope::of(ResourceKind::ChatMessage)
            .in_course(course)
            .owned_by(Uuid::new_v4());

        let admin = ctx(Role::Admin, Some(course), PermissionFlags::default());
        assert_eq!(
            deny_reason(authorize(&admin, Action::Delete, &message)),
            "You do not have permission to manage chat messages"
        );

        let moderator = ctx(
            Role::Admin,
            Some(course),
            PermissionFlags {
                manage_chat: true,
                ..PermissionFlags::default()
            },
        );
        assert!(authorize(&moderator, Action::Delete, &message).is_ok());
        // Even with the flag, editing someone else's message stays denied.
        assert!(authorize(&moderator, Action::Update, &message).is_err());
    }

    #[test]
    fn doctor_dashboard_requires_the_view_flag() {
        let course = Uuid::new_v4();
        let dashboard = ResourceScope::of(ResourceKind::DoctorDashboard).in_course(course);

        let admin = ctx(Role::Admin, Some(course), PermissionFlags::default());
        assert_eq!(
            deny_reason(authorize(&admin, Action::Read, &dashboard)),
            "You do not have permission to view the doctor dashboard"
        );

        let granted = ctx(
            Role::Admin,
            Some(course),
            PermissionFlags {
                view_doctor_dashboard: true,
                ..PermissionFlags::default()
            },
        );
        assert!(authorize(&granted, Action::Read, &dashboard).is_ok());

        let doctor = ctx(Role::Doctor, Some(course), PermissionFlags::default());
        assert!(authorize(&doctor, Action::Read, &dashboard).is_ok());

        let instructor = ctx(Role::Instructor, Some(course), PermissionFlags::default());
        assert!(authorize(&instructor, Action::Read, &dashboard).is_err());
    }

    #[test]
    fn scoped_creation_rejects_a_foreign_target_course() {
        let own = Uuid::new_v4();
        let admin = ctx(Role::Admin, Some(own), PermissionFlags::default());
        let foreign = ResourceScope::of(ResourceKind::DisciplineIssue).in_course(Uuid::new_v4());

        assert_eq!(
            deny_reason(authorize(&admin, Action::Create, &foreign)),
            "Cannot create records outside your course"
        );
    }
}

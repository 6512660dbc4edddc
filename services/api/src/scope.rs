//! Course scoping, the tenancy layer of the platform
//!
//! Every authenticated request is resolved to a [`RequestContext`] once,
//! before any handler logic runs. The context carries the course scope
//! the actor is confined to and the capability flags that refine what an
//! admin may manage.

use uuid::Uuid;

use crate::middleware::AuthActor;
use crate::models::{Role, permission::PermissionFlags};

/// Visibility window of an actor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CourseScope {
    /// Super admins see across all courses
    Unscoped,
    /// Confined to a single course
    Course(Uuid),
    /// Staff account without a course assignment; sees nothing
    Unassigned,
}

impl CourseScope {
    /// Derives the scope from the authenticated actor
    pub fn for_actor(actor: &AuthActor) -> Self {
        if actor.role == Role::SuperAdmin {
            return CourseScope::Unscoped;
        }
        match actor.course_id {
            Some(course_id) => CourseScope::Course(course_id),
            None => CourseScope::Unassigned,
        }
    }
}

/// Course restriction applied to list queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CourseFilter {
    /// No course clause
    Any,
    /// Restrict to one course
    Course(Uuid),
    /// Match no rows at all
    Nothing,
}

/// Everything the authorization gate and the handlers need to know about
/// the caller, computed once per request
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub actor: AuthActor,
    pub scope: CourseScope,
    pub permissions: PermissionFlags,
}

impl RequestContext {
    /// Builds a context from an actor and their stored capability flags.
    /// Non-admin roles never consult flags, so callers pass the default.
    pub fn new(actor: AuthActor, permissions: PermissionFlags) -> Self {
        let scope = CourseScope::for_actor(&actor);
        Self {
            actor,
            scope,
            permissions,
        }
    }

    /// Effective course restriction for a list query. Super admins may
    /// narrow to any course via the `requested` override; for everyone
    /// else the override is ignored and their own scope applies.
    pub fn list_filter(&self, requested: Option<Uuid>) -> CourseFilter {
        match self.scope {
            CourseScope::Unscoped => match requested {
                Some(course_id) => CourseFilter::Course(course_id),
                None => CourseFilter::Any,
            },
            CourseScope::Course(own) => CourseFilter::Course(own),
            CourseScope::Unassigned => CourseFilter::Nothing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(role: Role, course_id: Option<Uuid>) -> AuthActor {
        AuthActor {
            id: Uuid::new_v4(),
            user_code: "TEST-001".to_string(),
            role,
            course_id,
        }
    }

    #[test]
    fn super_admin_is_unscoped_even_with_a_course() {
        let ctx = RequestContext::new(
            actor(Role::SuperAdmin, Some(Uuid::new_v4())),
            PermissionFlags::default(),
        );
        assert_eq!(ctx.scope, CourseScope::Unscoped);
    }

    #[test]
    fn staff_scope_follows_course_assignment() {
        let course_id = Uuid::new_v4();
        let ctx = RequestContext::new(
            actor(Role::Admin, Some(course_id)),
            PermissionFlags::default(),
        );
        assert_eq!(ctx.scope, CourseScope::Course(course_id));

        let ctx = RequestContext::new(actor(Role::Doctor, None), PermissionFlags::default());
        assert_eq!(ctx.scope, CourseScope::Unassigned);
    }

    #[test]
    fn super_admin_may_override_the_list_filter() {
        let ctx = RequestContext::new(actor(Role::SuperAdmin, None), PermissionFlags::default());
        let requested = Uuid::new_v4();
        assert_eq!(ctx.list_filter(None), CourseFilter::Any);
        assert_eq!(
            ctx.list_filter(Some(requested)),
            CourseFilter::Course(requested)
        );
    }

    #[test]
    fn scoped_actors_cannot_escape_via_the_override() {
        let own = Uuid::new_v4();
        let other = Uuid::new_v4();
        let ctx = RequestContext::new(actor(Role::Admin, Some(own)), PermissionFlags::default());
        assert_eq!(ctx.list_filter(Some(other)), CourseFilter::Course(own));
    }

    #[test]
    fn unassigned_staff_list_nothing() {
        let ctx = RequestContext::new(actor(Role::Instructor, None), PermissionFlags::default());
        assert_eq!(ctx.list_filter(Some(Uuid::new_v4())), CourseFilter::Nothing);
    }
}

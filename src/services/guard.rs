//! Access guard
//!
//! Decides, before any view logic runs, whether the current identity may see a
//! role-protected page and where to send it otherwise. The decision is pure so
//! every protected view evaluates exactly the same rules.

use crate::models::{Role, User};

pub const LOGIN_URL: &str = "/login";
pub const ADMIN_URL: &str = "/admin/";
pub const ADMIN_LOGIN_URL: &str = "/admin/login";
pub const FACULTY_HOME_URL: &str = "/faculty/";
pub const STUDENT_HOME_URL: &str = "/student/";

/// Result of a guard check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardOutcome {
    Proceed,
    Redirect(&'static str),
}

/// Dashboard URL for a role
pub fn home_url(role: Role) -> &'static str {
    match role {
        Role::Faculty => FACULTY_HOME_URL,
        Role::Student => STUDENT_HOME_URL,
    }
}

/// Check access to a view that requires `required`.
///
/// Precedence: anonymous goes to login; holding the role proceeds; staff go
/// to the console; holders of the other role go to their own dashboard;
/// anyone else goes to login.
pub fn check(user: Option<&User>, required: Role) -> GuardOutcome {
    let Some(user) = user else {
        return GuardOutcome::Redirect(LOGIN_URL);
    };

    if user.has_role(required) {
        GuardOutcome::Proceed
    } else if user.is_admin() {
        GuardOutcome::Redirect(ADMIN_URL)
    } else if user.has_role(required.other()) {
        GuardOutcome::Redirect(home_url(required.other()))
    } else {
        GuardOutcome::Redirect(LOGIN_URL)
    }
}

/// Check access to the administrative console
pub fn check_staff(user: Option<&User>) -> GuardOutcome {
    match user {
        None => GuardOutcome::Redirect(ADMIN_LOGIN_URL),
        Some(user) if user.is_admin() => GuardOutcome::Proceed,
        Some(_) => GuardOutcome::Redirect(LOGIN_URL),
    }
}

/// Where a freshly logged-in user lands, if anywhere
pub fn landing_url(user: &User) -> Option<&'static str> {
    if user.is_admin() {
        Some(ADMIN_URL)
    } else if user.has_role(Role::Faculty) {
        Some(FACULTY_HOME_URL)
    } else if user.has_role(Role::Student) {
        Some(STUDENT_HOME_URL)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn user(roles: &[Role], is_staff: bool, is_superuser: bool) -> User {
        User {
            id: 1,
            username: "someone".to_string(),
            email: String::new(),
            first_name: String::new(),
            password_hash: String::new(),
            is_staff,
            is_superuser,
            roles: roles.iter().copied().collect::<BTreeSet<_>>(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_anonymous_goes_to_login() {
        assert_eq!(check(None, Role::Faculty), GuardOutcome::Redirect(LOGIN_URL));
        assert_eq!(check(None, Role::Student), GuardOutcome::Redirect(LOGIN_URL));
    }

    #[test]
    fn test_staff_on_student_view_goes_to_console() {
        let admin = user(&[], true, false);
        assert_eq!(check(Some(&admin), Role::Student), GuardOutcome::Redirect(ADMIN_URL));
    }

    #[test]
    fn test_student_on_faculty_view_goes_to_student_dashboard() {
        let student = user(&[Role::Student], false, false);
        assert_eq!(
            check(Some(&student), Role::Faculty),
            GuardOutcome::Redirect(STUDENT_HOME_URL)
        );
    }

    #[test]
    fn test_role_wins_over_staff_flag() {
        let staff_faculty = user(&[Role::Faculty], true, true);
        assert_eq!(check(Some(&staff_faculty), Role::Faculty), GuardOutcome::Proceed);
    }

    #[test]
    fn test_roleless_user_goes_to_login() {
        let nobody = user(&[], false, false);
        assert_eq!(check(Some(&nobody), Role::Faculty), GuardOutcome::Redirect(LOGIN_URL));
    }

    #[test]
    fn test_staff_guard() {
        assert_eq!(check_staff(None), GuardOutcome::Redirect(ADMIN_LOGIN_URL));
        assert_eq!(check_staff(Some(&user(&[], false, true))), GuardOutcome::Proceed);
        assert_eq!(
            check_staff(Some(&user(&[Role::Student], false, false))),
            GuardOutcome::Redirect(LOGIN_URL)
        );
    }

    #[test]
    fn test_landing_url() {
        assert_eq!(landing_url(&user(&[Role::Faculty], true, false)), Some(ADMIN_URL));
        assert_eq!(landing_url(&user(&[Role::Faculty], false, false)), Some(FACULTY_HOME_URL));
        assert_eq!(landing_url(&user(&[Role::Student], false, false)), Some(STUDENT_HOME_URL));
        assert_eq!(landing_url(&user(&[], false, false)), None);
    }

    fn role_strategy() -> impl Strategy<Value = Role> {
        prop_oneof![Just(Role::Faculty), Just(Role::Student)]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn guard_precedence(
            has_faculty in any::<bool>(),
            has_student in any::<bool>(),
            is_staff in any::<bool>(),
            is_superuser in any::<bool>(),
            required in role_strategy(),
        ) {
            let mut roles = Vec::new();
            if has_faculty { roles.push(Role::Faculty); }
            if has_student { roles.push(Role::Student); }
            let u = user(&roles, is_staff, is_superuser);

            let expected = if u.has_role(required) {
                GuardOutcome::Proceed
            } else if is_staff || is_superuser {
                GuardOutcome::Redirect(ADMIN_URL)
            } else if u.has_role(required.other()) {
                GuardOutcome::Redirect(home_url(required.other()))
            } else {
                GuardOutcome::Redirect(LOGIN_URL)
            };

            prop_assert_eq!(check(Some(&u), required), expected);
        }
    }
}

//! Deciding whether the current session may see a view.

use crate::{session::Session, Role};
use std::collections::BTreeMap;

pub const HOME_PATH: &str = "/";
pub const LOGIN_PATH: &str = "/login";
pub const REGISTER_PATH: &str = "/register";

/// Who may see a view.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Access {
    /// Anyone, logged in or not.
    Public,
    /// Any authenticated user, whatever their role.
    Authenticated,
    /// Authenticated users with one of these roles.
    Roles(&'static [Role]),
}

/// Where a navigation should go instead of the requested view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub to: String,
    /// The location originally asked for, kept so a successful login can
    /// return there.
    pub from: Option<String>,
}

impl Redirect {
    fn to(path: &str) -> Self {
        Redirect {
            to: path.to_string(),
            from: None,
        }
    }
}

/// The outcome of guarding a single navigation. It is always exactly one
/// of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Render,
    Redirect(Redirect),
}

/// Check `session` against a view's declared access for the navigation to
/// `location`.
pub fn guard(session: &Session, access: Access, location: &str) -> Decision {
    let allowed = match access {
        Access::Public => return Decision::Render,
        Access::Authenticated => None,
        Access::Roles(roles) => Some(roles),
    };

    let role = match session.user() {
        Some(user) if session.is_authenticated() => user.role,
        _ => {
            log::debug!("Sending an anonymous visit to {} to login", location);
            return Decision::Redirect(Redirect {
                to: LOGIN_PATH.to_string(),
                from: Some(location.to_string()),
            });
        },
    };

    match allowed {
        Some(roles) if !roles.contains(&role) => {
            log::debug!("{} may not view {}", role, location);
            Decision::Redirect(Redirect::to(role.landing_path()))
        },
        _ => Decision::Render,
    }
}

/// Where to go once a login succeeds.
///
/// The preserved location wins unless it is one of the pages you only visit
/// while logged out, in which case the role's landing view is used.
pub fn after_login(from: Option<&str>, role: Role) -> String {
    match from {
        Some(from) if !is_entry_page(from) => from.to_string(),
        _ => role.landing_path().to_string(),
    }
}

fn is_entry_page(location: &str) -> bool {
    let path = path_of(location).trim_end_matches('/');
    path.is_empty() || path == LOGIN_PATH || path == REGISTER_PATH
}

/// Drop any query string or fragment.
fn path_of(location: &str) -> &str {
    location
        .split(|c: char| c == '?' || c == '#')
        .next()
        .unwrap_or(location)
}

/// The application's views.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum View {
    Landing,
    Login,
    Register,
    StudentDashboard,
    StudentProfile,
    StudentEvidence,
    StudentCompetency,
    AdminDashboard,
    AdminStudents,
    AdminSkills,
    AdminEvaluate,
    AdminAnalytics,
    AdminStudentDetail,
}

/// A path pattern like `/admin/students/:id` and who may see it.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Route {
    pub pattern: &'static str,
    pub view: View,
    pub access: Access,
}

impl Route {
    pub const fn new(
        pattern: &'static str,
        view: View,
        access: Access,
    ) -> Self {
        Route {
            pattern,
            view,
            access,
        }
    }

    fn matches(&self, path: &str) -> Option<BTreeMap<String, String>> {
        let mut params = BTreeMap::new();
        let mut wanted = segments(self.pattern);
        let mut actual = segments(path);

        loop {
            match (wanted.next(), actual.next()) {
                (None, None) => return Some(params),
                (Some(w), Some(a)) if w.starts_with(':') => {
                    params.insert(w[1..].to_string(), a.to_string());
                },
                (Some(w), Some(a)) if w == a => {},
                _ => return None,
            }
        }
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

const STUDENT_ONLY: Access = Access::Roles(&[Role::Student]);
const ADMIN_ONLY: Access = Access::Roles(&[Role::Admin]);

/// Every route the application knows about.
pub const ROUTES: &[Route] = &[
    Route::new("/", View::Landing, Access::Public),
    Route::new("/login", View::Login, Access::Public),
    Route::new("/register", View::Register, Access::Public),
    Route::new("/student/dashboard", View::StudentDashboard, STUDENT_ONLY),
    Route::new("/student/profile", View::StudentProfile, STUDENT_ONLY),
    Route::new("/student/evidence", View::StudentEvidence, STUDENT_ONLY),
    Route::new("/student/competency", View::StudentCompetency, STUDENT_ONLY),
    Route::new("/admin/dashboard", View::AdminDashboard, ADMIN_ONLY),
    Route::new("/admin/students", View::AdminStudents, ADMIN_ONLY),
    Route::new("/admin/skills", View::AdminSkills, ADMIN_ONLY),
    Route::new("/admin/evaluate", View::AdminEvaluate, ADMIN_ONLY),
    Route::new("/admin/analytics", View::AdminAnalytics, ADMIN_ONLY),
    Route::new("/admin/students/:id", View::AdminStudentDetail, ADMIN_ONLY),
];

/// What the router decided to do with a navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Render {
        view: View,
        params: BTreeMap<String, String>,
    },
    Redirect(Redirect),
}

/// Matches locations against a set of routes and guards them.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new<I: IntoIterator<Item = Route>>(routes: I) -> Self {
        RouteTable {
            routes: routes.into_iter().collect(),
        }
    }

    pub fn routes(&self) -> &[Route] { &self.routes }

    /// Resolve a location (which may carry a query string or fragment).
    ///
    /// Unknown paths send authenticated users to their landing view and
    /// everyone else to the landing page.
    pub fn navigate(&self, session: &Session, location: &str) -> Navigation {
        let path = path_of(location);

        let found = self
            .routes
            .iter()
            .find_map(|route| route.matches(path).map(|p| (route, p)));

        let (route, params) = match found {
            Some(found) => found,
            None => {
                log::debug!("No route matches {}", location);
                let to = match session.role() {
                    Some(role) if session.is_authenticated() => {
                        role.landing_path()
                    },
                    _ => HOME_PATH,
                };
                return Navigation::Redirect(Redirect::to(to));
            },
        };

        match guard(session, route.access, location) {
            Decision::Render => Navigation::Render {
                view: route.view,
                params,
            },
            Decision::Redirect(redirect) => Navigation::Redirect(redirect),
        }
    }
}

impl Default for RouteTable {
    fn default() -> RouteTable { RouteTable::new(ROUTES.iter().copied()) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SessionStore, User};

    fn user(role: Role) -> User {
        User {
            id: 1,
            email: String::from("someone@school.edu"),
            name: String::from("someone"),
            role,
        }
    }

    fn logged_in(role: Role) -> Session {
        let store = SessionStore::in_memory();
        store.set_auth("tok", user(role));
        store.snapshot()
    }

    #[test]
    fn anonymous_users_are_sent_to_login() {
        let session = Session::default();

        let got = guard(&session, STUDENT_ONLY, "/student/evidence");

        assert_eq!(
            got,
            Decision::Redirect(Redirect {
                to: String::from("/login"),
                from: Some(String::from("/student/evidence")),
            })
        );
    }

    #[test]
    fn retry_after_login_renders() {
        let store = SessionStore::in_memory();
        let location = "/student/evidence";
        let first = guard(&store.snapshot(), STUDENT_ONLY, location);
        assert!(matches!(first, Decision::Redirect(_)));

        store.set_auth("tok", user(Role::Student));

        assert_eq!(
            guard(&store.snapshot(), STUDENT_ONLY, location),
            Decision::Render
        );
    }

    #[test]
    fn wrong_role_goes_to_its_own_landing_view() {
        let session = logged_in(Role::Student);

        let got = guard(&session, ADMIN_ONLY, "/admin/skills");

        assert_eq!(
            got,
            Decision::Redirect(Redirect {
                to: String::from("/student/dashboard"),
                from: None,
            })
        );
    }

    #[test]
    fn unrestricted_views_only_need_a_login() {
        assert_eq!(
            guard(&logged_in(Role::Admin), Access::Authenticated, "/x"),
            Decision::Render
        );
        assert!(matches!(
            guard(&Session::default(), Access::Authenticated, "/x"),
            Decision::Redirect(_)
        ));
        assert_eq!(
            guard(&Session::default(), Access::Public, "/"),
            Decision::Render
        );
    }

    #[test]
    fn post_login_destination() {
        assert_eq!(after_login(None, Role::Admin), "/admin/dashboard");
        assert_eq!(after_login(Some("/"), Role::Student), "/student/dashboard");
        assert_eq!(after_login(Some(""), Role::Admin), "/admin/dashboard");
        assert_eq!(
            after_login(Some("/student/profile"), Role::Student),
            "/student/profile"
        );
    }

    #[test]
    fn route_table_captures_parameters() {
        let table = RouteTable::default();

        let got = table.navigate(&logged_in(Role::Admin), "/admin/students/17");

        let mut params = BTreeMap::new();
        params.insert(String::from("id"), String::from("17"));
        assert_eq!(
            got,
            Navigation::Render {
                view: View::AdminStudentDetail,
                params,
            }
        );
    }

    #[test]
    fn route_table_keeps_the_query_in_the_preserved_location() {
        let table = RouteTable::default();

        let got = table.navigate(&Session::default(), "/admin/students?page=2");

        assert_eq!(
            got,
            Navigation::Redirect(Redirect {
                to: String::from("/login"),
                from: Some(String::from("/admin/students?page=2")),
            })
        );
    }

    #[test]
    fn unknown_paths_fall_back_by_session() {
        let table = RouteTable::default();

        assert_eq!(
            table.navigate(&Session::default(), "/nope"),
            Navigation::Redirect(Redirect::to("/"))
        );
        assert_eq!(
            table.navigate(&logged_in(Role::Admin), "/nope"),
            Navigation::Redirect(Redirect::to("/admin/dashboard"))
        );
    }

    #[test]
    fn trailing_slashes_are_ignored() {
        let table = RouteTable::default();

        let got =
            table.navigate(&logged_in(Role::Student), "/student/profile/");

        assert!(matches!(
            got,
            Navigation::Render {
                view: View::StudentProfile,
                ..
            }
        ));
    }

    #[test]
    fn never_go_back_to_the_login_or_register_pages() {
        for from in &["/login", "/register", "/login?from=x", "/register/"] {
            assert_eq!(
                after_login(Some(*from), Role::Student),
                "/student/dashboard",
                "{}",
                from
            );
        }

        assert_eq!(
            after_login(Some("/admin/skills?page=2"), Role::Admin),
            "/admin/skills?page=2"
        );
    }
}

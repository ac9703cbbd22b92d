//! The backend's endpoints, grouped the way the backend groups them.
//!
//! Every call goes through [`ApiClient`](crate::ApiClient), so none of these
//! need to worry about credentials or expired sessions.

mod admin;
mod auth;
mod skills;
mod student;

pub use admin::{
    admin_dashboard, create_skill, create_student, delete_student,
    evaluate_student, skill_summary, top_students, update_skill,
    update_student, AdminDashboard,
};
pub use auth::{login, login_and_store, register, LoginError};
pub use skills::{get_skill, list_skills};
pub use student::{
    competency, profile, student_dashboard, submit_evidence, update_profile,
    StudentDashboard,
};

use crate::{
    client::{ApiClient, ApiError},
    types::{
        CompetencyData, EvidenceSubmission, ProfileUpdate, Skill,
        StudentProfile,
    },
    UserPatch,
};
use reqwest::{
    multipart::{Form, Part},
    Method,
};

/// Fetch the logged in student's profile.
pub async fn profile(client: &ApiClient) -> Result<StudentProfile, ApiError> {
    client.get("/student/me").await
}

/// Update the logged in student's profile.
///
/// A changed name is mirrored into the session so the rest of the UI sees it
/// straight away.
pub async fn update_profile(
    client: &ApiClient,
    update: &ProfileUpdate,
) -> Result<(), ApiError> {
    client
        .send_json(Method::PUT, "/student/profile", update)
        .await?;

    if let Some(name) = &update.name {
        client.session().update_user(UserPatch::name(name.as_str()));
    }

    Ok(())
}

/// Upload evidence of a skill, optionally with a file attached.
pub async fn submit_evidence(
    client: &ApiClient,
    submission: &EvidenceSubmission,
) -> Result<(), ApiError> {
    let mut form = Form::new()
        .text("skillId", submission.skill_id.to_string())
        .text("description", submission.description.clone());

    if let Some(file) = &submission.file {
        let mut part = Part::bytes(file.contents.clone())
            .file_name(file.filename.clone());
        if let Some(mime_type) = &file.mime_type {
            part = part.mime_str(mime_type)?;
        }
        form = form.part("file", part);
    }

    log::trace!(
        "Submitting evidence for skill {} ({} attachment)",
        submission.skill_id,
        if submission.file.is_some() { "with" } else { "no" },
    );
    let url = client.url("/student/evidence")?;
    client
        .send(client.request(Method::POST, url).multipart(form))
        .await?;

    Ok(())
}

/// Fetch the logged in student's competencies.
pub async fn competency(
    client: &ApiClient,
) -> Result<CompetencyData, ApiError> {
    client.get("/student/competency").await
}

/// The data behind the student dashboard.
///
/// Each half is fetched independently, so one failing doesn't hide the
/// other.
#[derive(Debug)]
pub struct StudentDashboard {
    pub competency: Result<CompetencyData, ApiError>,
    pub skills: Result<Vec<Skill>, ApiError>,
}

pub async fn student_dashboard(client: &ApiClient) -> StudentDashboard {
    let (competency, skills) =
        tokio::join!(competency(client), super::list_skills(client));

    StudentDashboard { competency, skills }
}

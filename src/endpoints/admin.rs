use crate::{
    client::{ApiClient, ApiError},
    types::{
        Evaluation, NewSkill, NewStudent, SkillSummary, SkillUpdate,
        StudentUpdate, TopStudent,
    },
};
use reqwest::Method;

pub async fn create_student(
    client: &ApiClient,
    student: &NewStudent,
) -> Result<(), ApiError> {
    client
        .send_json(Method::POST, "/admin/students", student)
        .await?;
    Ok(())
}

pub async fn update_student(
    client: &ApiClient,
    id: i64,
    update: &StudentUpdate,
) -> Result<(), ApiError> {
    client
        .send_json(Method::PUT, &format!("/admin/students/{}", id), update)
        .await?;
    Ok(())
}

pub async fn delete_student(
    client: &ApiClient,
    id: i64,
) -> Result<(), ApiError> {
    client.delete(&format!("/admin/students/{}", id)).await
}

pub async fn create_skill(
    client: &ApiClient,
    skill: &NewSkill,
) -> Result<(), ApiError> {
    client.send_json(Method::POST, "/admin/skills", skill).await?;
    Ok(())
}

pub async fn update_skill(
    client: &ApiClient,
    id: i64,
    update: &SkillUpdate,
) -> Result<(), ApiError> {
    client
        .send_json(Method::PUT, &format!("/admin/skills/{}", id), update)
        .await?;
    Ok(())
}

/// Record a score for one of a student's skills.
pub async fn evaluate_student(
    client: &ApiClient,
    student_id: i64,
    evaluation: &Evaluation,
) -> Result<(), ApiError> {
    let path = format!("/admin/evaluate/{}", student_id);
    client.send_json(Method::POST, &path, evaluation).await?;
    Ok(())
}

/// The best performing students, best first.
pub async fn top_students(
    client: &ApiClient,
    limit: Option<u32>,
) -> Result<Vec<TopStudent>, ApiError> {
    let mut url = client.url("/admin/top-students")?;
    if let Some(limit) = limit {
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string());
    }

    client.get_url(url).await
}

/// Per-skill score statistics across every student.
pub async fn skill_summary(
    client: &ApiClient,
) -> Result<Vec<SkillSummary>, ApiError> {
    client.get("/admin/skill-summary").await
}

/// The data behind the admin dashboard, fetched concurrently and reported
/// independently.
#[derive(Debug)]
pub struct AdminDashboard {
    pub top_students: Result<Vec<TopStudent>, ApiError>,
    pub skill_summary: Result<Vec<SkillSummary>, ApiError>,
}

pub async fn admin_dashboard(client: &ApiClient) -> AdminDashboard {
    let (top_students, skill_summary) =
        tokio::join!(top_students(client, Some(10)), skill_summary(client));

    AdminDashboard {
        top_students,
        skill_summary,
    }
}

use crate::{
    client::{ApiClient, ApiError},
    types::Skill,
};

/// Fetch the whole skills catalog.
pub async fn list_skills(client: &ApiClient) -> Result<Vec<Skill>, ApiError> {
    client.get("/skills").await
}

pub async fn get_skill(client: &ApiClient, id: i64) -> Result<Skill, ApiError> {
    client.get(&format!("/skills/{}", id)).await
}

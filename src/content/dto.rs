use serde::{Deserialize, Serialize};

use super::repo::PageContent;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionResponse {
    pub success: bool,
    pub section_id: String,
    pub html: String,
}

/// `html` is optional so that a missing field can be told apart from `""`.
#[derive(Debug, Deserialize)]
pub struct UpdateSectionRequest {
    #[serde(default)]
    pub html: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSectionResponse {
    pub success: bool,
    pub message: String,
    pub section_id: String,
    pub html: String,
}

#[derive(Debug, Serialize)]
pub struct SectionListResponse {
    pub success: bool,
    pub content: Vec<PageContent>,
}

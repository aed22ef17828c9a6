use serde::Serialize;
use studyhall_shared::StudyStatus;

use crate::commands::controller;
use crate::mirrors::PresenceEntry;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceDto {
    pub user_id: String,
    pub user_name: String,
    pub status: String,
    pub subject: Option<String>,
    pub started_at: String,
    pub last_active: String,
}

impl From<PresenceEntry> for PresenceDto {
    fn from(entry: PresenceEntry) -> Self {
        Self {
            user_id: entry.user.id().to_string(),
            user_name: entry.user.name().to_string(),
            status: entry.session.status.to_string(),
            subject: entry.session.subject,
            started_at: entry.session.started_at.to_rfc3339(),
            last_active: entry.session.last_active.to_rfc3339(),
        }
    }
}

pub fn list_presence(state: &AppState) -> Result<Vec<PresenceDto>, String> {
    let controller = controller(state)?;
    Ok(controller
        .presence()
        .into_iter()
        .map(PresenceDto::from)
        .collect())
}

pub async fn update_study_status(
    state: &AppState,
    status: String,
    subject: Option<String>,
) -> Result<(), String> {
    let status: StudyStatus = status
        .parse()
        .map_err(|e| format!("Invalid status: {e}"))?;
    controller(state)?
        .update_study_status(status, subject.as_deref())
        .await
        .map_err(|_| "Could not update study status".to_string())
}

use serde::Serialize;
use studyhall_shared::UserId;

use crate::commands::controller;
use crate::mirrors::FeedMessage;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDto {
    pub id: String,
    pub user_id: String,
    pub user_name: String,
    pub message: String,
    pub mentions: Vec<String>,
    pub created_at: String,
}

impl From<FeedMessage> for MessageDto {
    fn from(entry: FeedMessage) -> Self {
        Self {
            id: entry.message.id.to_string(),
            user_id: entry.author.id().to_string(),
            user_name: entry.author.name().to_string(),
            message: entry.message.message,
            mentions: entry
                .message
                .mentions
                .iter()
                .map(ToString::to_string)
                .collect(),
            created_at: entry.message.created_at.to_rfc3339(),
        }
    }
}

/// The feed window, oldest first.
pub fn list_messages(state: &AppState) -> Result<Vec<MessageDto>, String> {
    let controller = controller(state)?;
    Ok(controller
        .messages()
        .into_iter()
        .map(MessageDto::from)
        .collect())
}

pub async fn send_group_message(
    state: &AppState,
    message: String,
    mentions: Vec<String>,
) -> Result<(), String> {
    let mentions = mentions
        .iter()
        .map(|m| UserId::parse(m).map_err(|e| format!("Invalid mention: {e}")))
        .collect::<Result<Vec<_>, _>>()?;
    controller(state)?
        .send_group_message(&message, &mentions)
        .await
        .map_err(|_| "Could not send message".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use studyhall_store::Database;

    use crate::backend::LocalBackend;
    use crate::commands::{is_loading, presence};
    use crate::config::ClientConfig;

    #[tokio::test]
    async fn test_chat_and_presence_commands() {
        let local = LocalBackend::new(Database::open_in_memory(64).unwrap());
        let ada = local
            .with_database(|db| db.insert_user("Ada", "ada@example.com"))
            .unwrap();
        let mut state = AppState::new(ClientConfig::default(), Arc::new(local));
        assert!(!is_loading(&state));
        state.sign_in(ada.id).await;

        send_group_message(&state, "hello".into(), vec![ada.id.to_string()])
            .await
            .unwrap();
        assert_eq!(
            send_group_message(&state, "  ".into(), vec![]).await.unwrap_err(),
            "Could not send message"
        );

        let messages = list_messages(&state).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].user_name, "Ada");
        assert_eq!(messages[0].mentions, vec![ada.id.to_string()]);

        presence::update_study_status(&state, "studying".into(), Some("Latin".into()))
            .await
            .unwrap();
        assert!(
            presence::update_study_status(&state, "napping".into(), None)
                .await
                .is_err()
        );
        let rows = presence::list_presence(&state).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, "studying");
        assert_eq!(rows[0].subject.as_deref(), Some("Latin"));
    }
}

use serde::Serialize;
use studyhall_shared::UserId;
use uuid::Uuid;

use crate::commands::controller;
use crate::mirrors::{FriendEntry, IncomingRequest};
use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendDto {
    pub id: String,
    pub friend_id: String,
    pub friend_name: String,
    pub friend_email: String,
    pub created_at: String,
}

impl From<FriendEntry> for FriendDto {
    fn from(entry: FriendEntry) -> Self {
        Self {
            id: entry.link.id.to_string(),
            friend_id: entry.friend.id().to_string(),
            friend_name: entry.friend.name().to_string(),
            friend_email: entry.friend.email().to_string(),
            created_at: entry.link.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequestDto {
    pub id: String,
    pub sender_id: String,
    pub sender_name: String,
    pub sender_email: String,
    pub status: String,
    pub created_at: String,
}

impl From<IncomingRequest> for FriendRequestDto {
    fn from(entry: IncomingRequest) -> Self {
        Self {
            id: entry.request.id.to_string(),
            sender_id: entry.sender.id().to_string(),
            sender_name: entry.sender.name().to_string(),
            sender_email: entry.sender.email().to_string(),
            status: entry.request.status.to_string(),
            created_at: entry.request.created_at.to_rfc3339(),
        }
    }
}

pub fn list_friends(state: &AppState) -> Result<Vec<FriendDto>, String> {
    let controller = controller(state)?;
    Ok(controller.friends().into_iter().map(FriendDto::from).collect())
}

pub fn list_friend_requests(state: &AppState) -> Result<Vec<FriendRequestDto>, String> {
    let controller = controller(state)?;
    Ok(controller
        .friend_requests()
        .into_iter()
        .map(FriendRequestDto::from)
        .collect())
}

pub async fn send_friend_request(state: &AppState, email: String) -> Result<(), String> {
    controller(state)?
        .send_friend_request(&email)
        .await
        .map_err(|_| "Could not send friend request".to_string())
}

pub async fn accept_friend_request(state: &AppState, request_id: String) -> Result<(), String> {
    let id = Uuid::parse_str(&request_id).map_err(|e| format!("Invalid request_id: {e}"))?;
    controller(state)?
        .accept_friend_request(id)
        .await
        .map_err(|_| "Could not accept friend request".to_string())
}

pub async fn reject_friend_request(state: &AppState, request_id: String) -> Result<(), String> {
    let id = Uuid::parse_str(&request_id).map_err(|e| format!("Invalid request_id: {e}"))?;
    controller(state)?
        .reject_friend_request(id)
        .await
        .map_err(|_| "Could not reject friend request".to_string())
}

pub async fn remove_friend(state: &AppState, friend_id: String) -> Result<(), String> {
    let id = UserId::parse(&friend_id).map_err(|e| format!("Invalid friend_id: {e}"))?;
    controller(state)?
        .remove_friend(id)
        .await
        .map_err(|_| "Could not remove friend".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use studyhall_store::Database;

    use crate::backend::LocalBackend;
    use crate::config::ClientConfig;

    #[tokio::test]
    async fn test_friend_commands() {
        let local = LocalBackend::new(Database::open_in_memory(64).unwrap());
        let ada = local
            .with_database(|db| db.insert_user("Ada", "ada@example.com"))
            .unwrap();
        let grace = local
            .with_database(|db| db.insert_user("Grace", "grace@example.com"))
            .unwrap();
        let backend = Arc::new(local);

        let mut ada_state = AppState::new(ClientConfig::default(), backend.clone());
        let mut grace_state = AppState::new(ClientConfig::default(), backend);
        assert_eq!(list_friends(&ada_state).unwrap_err(), "Not signed in");

        ada_state.sign_in(ada.id).await;
        grace_state.sign_in(grace.id).await;

        send_friend_request(&ada_state, "grace@example.com".into())
            .await
            .unwrap();
        let err = send_friend_request(&ada_state, "ada@example.com".into())
            .await
            .unwrap_err();
        assert_eq!(err, "Could not send friend request");

        let controller = grace_state.controller().unwrap();
        controller
            .reload(crate::mirrors::Collection::FriendRequests)
            .await;
        let requests = list_friend_requests(&grace_state).unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].sender_name, "Ada");
        assert_eq!(requests[0].status, "pending");

        accept_friend_request(&grace_state, requests[0].id.clone())
            .await
            .unwrap();
        let friends = list_friends(&grace_state).unwrap();
        assert_eq!(friends.len(), 1);
        assert_eq!(friends[0].friend_email, "ada@example.com");

        assert!(accept_friend_request(&grace_state, "not-a-uuid".into())
            .await
            .unwrap_err()
            .starts_with("Invalid request_id"));

        remove_friend(&grace_state, ada.id.to_string()).await.unwrap();
        assert!(list_friends(&grace_state).unwrap().is_empty());
    }
}

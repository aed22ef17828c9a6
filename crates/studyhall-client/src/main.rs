//! # studyhall
//!
//! Command-line front end for the Studyhall social layer.  Every command
//! runs against the configured database; commands acting as a user take
//! that user's email as their first argument.

use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use serde_json::json;
use studyhall_client::commands::{chat, donations, friends, presence};
use studyhall_client::{init_tracing, AppState, ClientConfig, LocalBackend, SyncController};
use studyhall_shared::UserId;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

const USAGE: &str = "\
usage: studyhall <command> [args]

  register <name> <email>
  befriend <as-email> <target-email>
  accept   <as-email> <request-id>
  reject   <as-email> <request-id>
  unfriend <as-email> <friend-email>
  status   <as-email> <studying|break|offline> [subject...]
  say      <as-email> <message...>
  snapshot <as-email>
  watch    <as-email>
  donate   <name> <email> <amount-cents> [message...]";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some((command, rest)) = args.split_first() else {
        println!("{USAGE}");
        return Ok(());
    };

    let config = ClientConfig::from_env();
    info!(?config, "Loaded configuration");

    let db = config.open_database().context("Failed to open database")?;
    let local = LocalBackend::new(db);
    let mut state = AppState::new(config, Arc::new(local.clone()));

    match (command.as_str(), rest) {
        ("register", [name, email]) => {
            let user = local.with_database(|db| db.insert_user(name, email))?;
            print_json(&json!({ "id": user.id.to_string(), "name": user.name, "email": user.email }))?;
        }
        ("befriend", [me, target]) => {
            sign_in(&mut state, me).await?;
            friends::send_friend_request(&state, target.clone())
                .await
                .map_err(|e| anyhow!(e))?;
        }
        ("accept", [me, request_id]) => {
            sign_in(&mut state, me).await?;
            friends::accept_friend_request(&state, request_id.clone())
                .await
                .map_err(|e| anyhow!(e))?;
        }
        ("reject", [me, request_id]) => {
            sign_in(&mut state, me).await?;
            friends::reject_friend_request(&state, request_id.clone())
                .await
                .map_err(|e| anyhow!(e))?;
        }
        ("unfriend", [me, friend]) => {
            sign_in(&mut state, me).await?;
            let friend = lookup(&state, friend).await?;
            friends::remove_friend(&state, friend.to_string())
                .await
                .map_err(|e| anyhow!(e))?;
        }
        ("status", [me, status, subject @ ..]) => {
            sign_in(&mut state, me).await?;
            let subject = (!subject.is_empty()).then(|| subject.join(" "));
            presence::update_study_status(&state, status.clone(), subject)
                .await
                .map_err(|e| anyhow!(e))?;
        }
        ("say", [me, words @ ..]) if !words.is_empty() => {
            sign_in(&mut state, me).await?;
            chat::send_group_message(&state, words.join(" "), Vec::new())
                .await
                .map_err(|e| anyhow!(e))?;
        }
        ("snapshot", [me]) => {
            sign_in(&mut state, me).await?;
            print_snapshot(&state)?;
        }
        ("watch", [me]) => {
            let controller = sign_in(&mut state, me).await?;
            let mut events = controller.subscribe_events();
            print_snapshot(&state)?;
            loop {
                tokio::select! {
                    event = events.recv() => match event {
                        Ok(event) => {
                            print_json(&event)?;
                            print_snapshot(&state)?;
                        }
                        Err(RecvError::Lagged(skipped)) => warn!(skipped, "Mirror events dropped"),
                        Err(RecvError::Closed) => break,
                    },
                    _ = tokio::signal::ctrl_c() => break,
                }
            }
        }
        ("donate", [name, email, amount, message @ ..]) => {
            let amount_cents: i64 = amount
                .parse()
                .with_context(|| format!("Invalid amount: {amount}"))?;
            let form = donations::DonationForm {
                donor_name: name.clone(),
                email: email.clone(),
                amount_cents,
                message: (!message.is_empty()).then(|| message.join(" ")),
            };
            let receipt = donations::submit_donation(&state, form)
                .await
                .map_err(|e| anyhow!(e))?;
            print_json(&receipt)?;
        }
        _ => bail!("unrecognised arguments\n\n{USAGE}"),
    }

    state.sign_out();
    Ok(())
}

async fn lookup(state: &AppState, email: &str) -> anyhow::Result<UserId> {
    let user = state
        .backend()
        .find_user_by_email(email)
        .await?
        .ok_or_else(|| anyhow!("No user registered with email {email}"))?;
    Ok(user.id)
}

async fn sign_in(
    state: &mut AppState,
    email: &str,
) -> anyhow::Result<Arc<SyncController>> {
    let user = lookup(state, email).await?;
    Ok(state.sign_in(user).await)
}

fn print_snapshot(state: &AppState) -> anyhow::Result<()> {
    print_json(&json!({
        "friends": friends::list_friends(state).map_err(|e| anyhow!(e))?,
        "friendRequests": friends::list_friend_requests(state).map_err(|e| anyhow!(e))?,
        "presence": presence::list_presence(state).map_err(|e| anyhow!(e))?,
        "messages": chat::list_messages(state).map_err(|e| anyhow!(e))?,
    }))
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

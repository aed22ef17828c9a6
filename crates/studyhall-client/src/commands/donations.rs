//! Donor acknowledgment form.
//!
//! Submissions do not need a signed-in user.

use serde::{Deserialize, Serialize};
use studyhall_shared::constants::MAX_DONATION_MESSAGE_LEN;
use studyhall_store::{Donation, NewDonation};
use tracing::{info, warn};

use crate::error::DonationError;
use crate::state::AppState;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationForm {
    pub donor_name: String,
    pub email: String,
    pub amount_cents: i64,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationReceipt {
    pub id: String,
    pub donor_name: String,
    pub amount_cents: i64,
    pub created_at: String,
}

impl From<Donation> for DonationReceipt {
    fn from(d: Donation) -> Self {
        Self {
            id: d.id.to_string(),
            donor_name: d.donor_name,
            amount_cents: d.amount_cents,
            created_at: d.created_at.to_rfc3339(),
        }
    }
}

/// Normalise and check a form before it is written.
pub fn validate(form: DonationForm) -> Result<NewDonation, DonationError> {
    let donor_name = form.donor_name.trim().to_string();
    if donor_name.is_empty() {
        return Err(DonationError::EmptyName);
    }

    let email = form.email.trim().to_lowercase();
    let valid_email = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    };
    if !valid_email {
        return Err(DonationError::InvalidEmail(email));
    }

    if form.amount_cents <= 0 {
        return Err(DonationError::NonPositiveAmount(form.amount_cents));
    }

    let message = form
        .message
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty());
    if message
        .as_ref()
        .is_some_and(|m| m.chars().count() > MAX_DONATION_MESSAGE_LEN)
    {
        return Err(DonationError::MessageTooLong {
            max: MAX_DONATION_MESSAGE_LEN,
        });
    }

    Ok(NewDonation {
        donor_name,
        email,
        amount_cents: form.amount_cents,
        message,
    })
}

pub async fn record_donation(
    state: &AppState,
    form: DonationForm,
) -> Result<Donation, DonationError> {
    let donation = validate(form)?;
    let saved = state.backend().insert_donation(donation).await?;
    info!(donation = %saved.id, amount_cents = saved.amount_cents, "Donation recorded");
    Ok(saved)
}

pub async fn submit_donation(
    state: &AppState,
    form: DonationForm,
) -> Result<DonationReceipt, String> {
    match record_donation(state, form).await {
        Ok(saved) => Ok(DonationReceipt::from(saved)),
        Err(e) => {
            warn!(error = %e, "Donation rejected");
            Err(match e {
                DonationError::Backend(_) => "Could not record donation".to_string(),
                other => other.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use studyhall_store::Database;

    use crate::backend::LocalBackend;
    use crate::config::ClientConfig;

    fn form(name: &str, email: &str, amount_cents: i64) -> DonationForm {
        DonationForm {
            donor_name: name.into(),
            email: email.into(),
            amount_cents,
            message: None,
        }
    }

    #[test]
    fn test_validation() {
        assert!(matches!(
            validate(form("  ", "a@b.org", 100)),
            Err(DonationError::EmptyName)
        ));
        for bad in ["", "plain", "@b.org", "a@", "a@b@c"] {
            assert!(
                matches!(validate(form("Ada", bad, 100)), Err(DonationError::InvalidEmail(_))),
                "{bad} accepted"
            );
        }
        assert!(matches!(
            validate(form("Ada", "a@b.org", 0)),
            Err(DonationError::NonPositiveAmount(0))
        ));

        let mut long = form("Ada", "a@b.org", 100);
        long.message = Some("x".repeat(MAX_DONATION_MESSAGE_LEN + 1));
        assert!(matches!(
            validate(long),
            Err(DonationError::MessageTooLong { .. })
        ));

        let mut ok = form(" Ada ", " Ada@Example.org ", 2500);
        ok.message = Some("   ".into());
        let donation = validate(ok).unwrap();
        assert_eq!(donation.donor_name, "Ada");
        assert_eq!(donation.email, "ada@example.org");
        assert_eq!(donation.message, None);
    }

    #[test]
    fn test_form_deserializes_camel_case() {
        let form: DonationForm = serde_json::from_str(
            r#"{"donorName":"Ada","email":"ada@example.org","amountCents":500}"#,
        )
        .unwrap();
        assert_eq!(form.amount_cents, 500);
        assert!(form.message.is_none());
    }

    #[tokio::test]
    async fn test_submit_without_session() {
        let local = LocalBackend::new(Database::open_in_memory(16).unwrap());
        let state = AppState::new(ClientConfig::default(), Arc::new(local.clone()));

        let receipt = submit_donation(&state, form("Ada", "ada@example.org", 1500))
            .await
            .unwrap();
        assert_eq!(receipt.donor_name, "Ada");
        assert_eq!(receipt.amount_cents, 1500);

        let err = submit_donation(&state, form("Ada", "nope", 1500))
            .await
            .unwrap_err();
        assert!(err.starts_with("Invalid email"));

        let stored = local.with_database(|db| db.list_donations()).unwrap();
        assert_eq!(stored.len(), 1);
    }
}

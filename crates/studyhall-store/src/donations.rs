//! Donor acknowledgments.

use chrono::Utc;
use rusqlite::params;
use studyhall_shared::{ChangeEvent, ChangeKind, Table};
use uuid::Uuid;

use crate::database::Database;
use crate::error::Result;
use crate::models::{Donation, NewDonation};
use crate::rows::{fmt_ts, parse_ts, parse_uuid};

impl Database {
    pub fn insert_donation(&self, donation: &NewDonation) -> Result<Donation> {
        let record = Donation {
            id: Uuid::new_v4(),
            donor_name: donation.donor_name.clone(),
            email: donation.email.clone(),
            amount_cents: donation.amount_cents,
            message: donation.message.clone(),
            created_at: Utc::now(),
        };

        self.conn().execute(
            "INSERT INTO donations (id, donor_name, email, amount_cents, message, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.id.to_string(),
                record.donor_name,
                record.email,
                record.amount_cents,
                record.message,
                fmt_ts(&record.created_at),
            ],
        )?;

        self.publish(ChangeEvent::new(Table::Donations, ChangeKind::Insert, record.id));
        Ok(record)
    }

    /// All donations, newest first.
    pub fn list_donations(&self) -> Result<Vec<Donation>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, donor_name, email, amount_cents, message, created_at
             FROM donations
             ORDER BY created_at DESC",
        )?;

        let rows = stmt.query_map([], |row| {
            let id_str: String = row.get(0)?;
            let created_str: String = row.get(5)?;
            Ok(Donation {
                id: parse_uuid(0, &id_str)?,
                donor_name: row.get(1)?,
                email: row.get(2)?,
                amount_cents: row.get(3)?,
                message: row.get(4)?,
                created_at: parse_ts(5, &created_str)?,
            })
        })?;

        let mut donations = Vec::new();
        for row in rows {
            donations.push(row?);
        }
        Ok(donations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;

    #[test]
    fn test_insert_and_list() {
        let db = Database::open_in_memory(16).unwrap();
        let saved = db
            .insert_donation(&NewDonation {
                donor_name: "Grace".into(),
                email: "grace@example.com".into(),
                amount_cents: 500,
                message: Some("keep going".into()),
            })
            .unwrap();

        let all = db.list_donations().unwrap();
        assert_eq!(all, vec![saved]);
    }

    #[test]
    fn test_non_positive_amount_rejected_by_schema() {
        let db = Database::open_in_memory(16).unwrap();
        let err = db
            .insert_donation(&NewDonation {
                donor_name: "Grace".into(),
                email: "grace@example.com".into(),
                amount_cents: 0,
                message: None,
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::Sqlite(_)));
    }
}

//! # Charge Repository
//!
//! The charge master: billable charges with a default HSN/SAC code,
//! currency and GST rates. Picking a charge on a grid row copies these
//! onto the row (see [`Charge::apply_to`]).

use sanbill_core::validation::{validate_charge_name, validate_gst_rate};
use sanbill_core::{Charge, GstRate, DEFAULT_CURRENCY};
use sqlx::{FromRow, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use super::{decode_rate, encode_decimal};
use crate::error::{DbError, DbResult};

/// Editable fields of a charge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeInput {
    pub charge_name: String,
    pub hsn_sac: String,
    pub currency: String,
    pub cgst_rate: GstRate,
    pub sgst_rate: GstRate,
}

impl ChargeInput {
    fn validate(&self) -> DbResult<()> {
        validate_charge_name(&self.charge_name)?;
        validate_gst_rate(self.cgst_rate)?;
        validate_gst_rate(self.sgst_rate)?;
        Ok(())
    }

    fn currency(&self) -> String {
        let currency = self.currency.trim();
        if currency.is_empty() {
            DEFAULT_CURRENCY.to_string()
        } else {
            currency.to_uppercase()
        }
    }
}

#[derive(Debug, FromRow)]
struct ChargeRow {
    id: String,
    charge_name: String,
    hsn_sac: String,
    currency: String,
    cgst_rate: String,
    sgst_rate: String,
}

impl TryFrom<ChargeRow> for Charge {
    type Error = DbError;

    fn try_from(row: ChargeRow) -> DbResult<Self> {
        Ok(Charge {
            cgst_rate: decode_rate("charges.cgst_rate", &row.cgst_rate)?,
            sgst_rate: decode_rate("charges.sgst_rate", &row.sgst_rate)?,
            id: row.id,
            charge_name: row.charge_name,
            hsn_sac: row.hsn_sac,
            currency: row.currency,
        })
    }
}

/// Repository for the charge master.
#[derive(Debug, Clone)]
pub struct ChargeRepository {
    pool: SqlitePool,
}

impl ChargeRepository {
    /// Creates a new ChargeRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ChargeRepository { pool }
    }

    /// Adds a charge. A blank currency is stored as `INR`.
    pub async fn add(&self, input: &ChargeInput) -> DbResult<Charge> {
        input.validate()?;

        let charge = Charge {
            id: Uuid::new_v4().to_string(),
            charge_name: input.charge_name.trim().to_string(),
            hsn_sac: input.hsn_sac.trim().to_string(),
            currency: input.currency(),
            cgst_rate: input.cgst_rate,
            sgst_rate: input.sgst_rate,
        };

        debug!(id = %charge.id, name = %charge.charge_name, "Adding charge");

        sqlx::query(
            r#"
            INSERT INTO charges (id, charge_name, hsn_sac, currency, cgst_rate, sgst_rate)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&charge.id)
        .bind(&charge.charge_name)
        .bind(&charge.hsn_sac)
        .bind(&charge.currency)
        .bind(encode_decimal(charge.cgst_rate.percent()))
        .bind(encode_decimal(charge.sgst_rate.percent()))
        .execute(&self.pool)
        .await?;

        Ok(charge)
    }

    /// Lists charges by name.
    pub async fn list(&self) -> DbResult<Vec<Charge>> {
        let rows: Vec<ChargeRow> = sqlx::query_as(
            r#"
            SELECT id, charge_name, hsn_sac, currency, cgst_rate, sgst_rate
            FROM charges
            ORDER BY charge_name COLLATE NOCASE
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Charge::try_from).collect()
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<Charge>> {
        let row: Option<ChargeRow> = sqlx::query_as(
            "SELECT id, charge_name, hsn_sac, currency, cgst_rate, sgst_rate FROM charges WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Charge::try_from).transpose()
    }

    pub async fn update(&self, id: &str, input: &ChargeInput) -> DbResult<()> {
        input.validate()?;

        let result = sqlx::query(
            r#"
            UPDATE charges
            SET charge_name = ?2, hsn_sac = ?3, currency = ?4, cgst_rate = ?5, sgst_rate = ?6
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(input.charge_name.trim())
        .bind(input.hsn_sac.trim())
        .bind(input.currency())
        .bind(encode_decimal(input.cgst_rate.percent()))
        .bind(encode_decimal(input.sgst_rate.percent()))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Charge", id));
        }
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM charges WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Charge", id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use rust_decimal_macros::dec;

    fn freight() -> ChargeInput {
        ChargeInput {
            charge_name: "Ocean Freight".into(),
            hsn_sac: "996521".into(),
            currency: "usd".into(),
            cgst_rate: GstRate::from_percent(dec!(2.5)),
            sgst_rate: GstRate::from_percent(dec!(2.5)),
        }
    }

    #[tokio::test]
    async fn test_add_list_get() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let charges = db.charges();

        let added = charges.add(&freight()).await.unwrap();
        assert_eq!(added.currency, "USD");

        let handling = charges
            .add(&ChargeInput {
                charge_name: "handling".into(),
                currency: " ".into(),
                ..freight()
            })
            .await
            .unwrap();
        assert_eq!(handling.currency, "INR");

        let names: Vec<String> = charges
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.charge_name)
            .collect();
        assert_eq!(names, vec!["handling".to_string(), "Ocean Freight".to_string()]);

        let stored = charges.get(&added.id).await.unwrap().unwrap();
        assert_eq!(stored.cgst_rate.percent(), dec!(2.5));
    }

    #[tokio::test]
    async fn test_rejects_rate_above_hundred() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let result = db
            .charges()
            .add(&ChargeInput {
                cgst_rate: GstRate::from_percent(dec!(120)),
                ..freight()
            })
            .await;
        assert!(matches!(result, Err(DbError::Validation(_))));
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let charges = db.charges();
        let added = charges.add(&freight()).await.unwrap();

        charges
            .update(
                &added.id,
                &ChargeInput {
                    cgst_rate: GstRate::from_percent(dec!(9)),
                    sgst_rate: GstRate::from_percent(dec!(9)),
                    ..freight()
                },
            )
            .await
            .unwrap();
        let updated = charges.get(&added.id).await.unwrap().unwrap();
        assert_eq!(updated.sgst_rate.to_string(), "9%");

        charges.delete(&added.id).await.unwrap();
        assert!(charges.get(&added.id).await.unwrap().is_none());
        assert!(matches!(
            charges.update(&added.id, &freight()).await,
            Err(DbError::NotFound { .. })
        ));
    }
}

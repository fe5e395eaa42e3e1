//! # Consignee Repository
//!
//! Customers and consignees (one table) and their postal addresses.
//!
//! ## Default Address
//! ```text
//! consignee "Acme Traders"
//!   ├── Head Office   is_default = 1   ◄── printed in the bill-to block
//!   ├── Warehouse     is_default = 0
//!   └── Branch        is_default = 0
//! ```
//! Making an address the default clears the flag on the siblings in the
//! same transaction, so a consignee never has two defaults.

use chrono::Utc;
use sanbill_core::validation::{validate_consignee_name, validate_gstin, validate_pan};
use sanbill_core::{Consignee, ConsigneeAddress};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use super::{decode_timestamp, non_blank};
use crate::error::{DbError, DbResult};

/// Editable fields of an address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressInput {
    pub label: String,
    pub address: String,
    pub state: String,
    pub state_code: String,
    pub pincode: String,
    pub country: String,
    pub is_default: bool,
}

#[derive(Debug, FromRow)]
struct ConsigneeRow {
    id: String,
    name: String,
    gstin: Option<String>,
    pan: Option<String>,
    created_at: String,
}

impl TryFrom<ConsigneeRow> for Consignee {
    type Error = DbError;

    fn try_from(row: ConsigneeRow) -> DbResult<Self> {
        Ok(Consignee {
            created_at: decode_timestamp("consignees.created_at", &row.created_at)?,
            id: row.id,
            name: row.name,
            gstin: row.gstin,
            pan: row.pan,
        })
    }
}

#[derive(Debug, FromRow)]
struct AddressRow {
    id: String,
    consignee_id: String,
    label: String,
    address: String,
    state: String,
    state_code: String,
    pincode: String,
    country: String,
    is_default: bool,
}

impl From<AddressRow> for ConsigneeAddress {
    fn from(row: AddressRow) -> Self {
        ConsigneeAddress {
            id: row.id,
            consignee_id: row.consignee_id,
            label: row.label,
            address: row.address,
            state: row.state,
            state_code: row.state_code,
            pincode: row.pincode,
            country: row.country,
            is_default: row.is_default,
        }
    }
}

fn validate_identity(name: &str, gstin: Option<&str>, pan: Option<&str>) -> DbResult<()> {
    validate_consignee_name(name)?;
    validate_gstin(gstin.unwrap_or_default())?;
    validate_pan(pan.unwrap_or_default())?;
    Ok(())
}

/// Clears `is_default` on every address of a consignee except `keep`.
async fn clear_other_defaults(
    conn: &mut SqliteConnection,
    consignee_id: &str,
    keep: &str,
) -> DbResult<()> {
    sqlx::query(
        "UPDATE consignee_addresses SET is_default = 0 WHERE consignee_id = ?1 AND id <> ?2",
    )
    .bind(consignee_id)
    .bind(keep)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Repository for consignee database operations.
#[derive(Debug, Clone)]
pub struct ConsigneeRepository {
    pool: SqlitePool,
}

impl ConsigneeRepository {
    /// Creates a new ConsigneeRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ConsigneeRepository { pool }
    }

    /// Adds a consignee.
    ///
    /// GSTIN and PAN are upper-cased; blank values are stored as NULL.
    pub async fn add(&self, name: &str, gstin: Option<&str>, pan: Option<&str>) -> DbResult<Consignee> {
        validate_identity(name, gstin, pan)?;

        let consignee = Consignee {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            gstin: non_blank(gstin).map(|g| g.to_uppercase()),
            pan: non_blank(pan).map(|p| p.to_uppercase()),
            created_at: Utc::now(),
        };

        debug!(id = %consignee.id, name = %consignee.name, "Adding consignee");

        sqlx::query(
            "INSERT INTO consignees (id, name, gstin, pan, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&consignee.id)
        .bind(&consignee.name)
        .bind(&consignee.gstin)
        .bind(&consignee.pan)
        .bind(consignee.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(consignee)
    }

    /// Lists consignees by name.
    ///
    /// With a search term, only those whose name, GSTIN or PAN contains it
    /// (case-insensitive for ASCII).
    pub async fn list(&self, search: Option<&str>) -> DbResult<Vec<Consignee>> {
        let pattern = non_blank(search).map(|s| format!("%{s}%"));
        debug!(search = ?pattern, "Listing consignees");

        let rows: Vec<ConsigneeRow> = sqlx::query_as(
            r#"
            SELECT id, name, gstin, pan, created_at
            FROM consignees
            WHERE ?1 IS NULL
               OR name LIKE ?1
               OR COALESCE(gstin, '') LIKE ?1
               OR COALESCE(pan, '') LIKE ?1
            ORDER BY name COLLATE NOCASE
            "#,
        )
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Consignee::try_from).collect()
    }

    /// Gets a consignee by ID.
    pub async fn get(&self, id: &str) -> DbResult<Option<Consignee>> {
        let row: Option<ConsigneeRow> =
            sqlx::query_as("SELECT id, name, gstin, pan, created_at FROM consignees WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(Consignee::try_from).transpose()
    }

    /// Updates name, GSTIN and PAN.
    pub async fn update(
        &self,
        id: &str,
        name: &str,
        gstin: Option<&str>,
        pan: Option<&str>,
    ) -> DbResult<()> {
        validate_identity(name, gstin, pan)?;

        let result = sqlx::query("UPDATE consignees SET name = ?2, gstin = ?3, pan = ?4 WHERE id = ?1")
            .bind(id)
            .bind(name.trim())
            .bind(non_blank(gstin).map(|g| g.to_uppercase()))
            .bind(non_blank(pan).map(|p| p.to_uppercase()))
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Consignee", id));
        }
        Ok(())
    }

    /// Deletes a consignee and its addresses.
    ///
    /// Jobs billed to it keep their data; their customer link is cleared.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM consignees WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Consignee", id));
        }
        info!(id = %id, "Consignee deleted");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Addresses
    // -------------------------------------------------------------------------

    /// Adds an address; with `is_default` set it becomes the only default.
    pub async fn add_address(
        &self,
        consignee_id: &str,
        input: &AddressInput,
    ) -> DbResult<ConsigneeAddress> {
        let address = ConsigneeAddress {
            id: Uuid::new_v4().to_string(),
            consignee_id: consignee_id.to_string(),
            label: input.label.trim().to_string(),
            address: input.address.trim().to_string(),
            state: input.state.trim().to_string(),
            state_code: input.state_code.trim().to_string(),
            pincode: input.pincode.trim().to_string(),
            country: input.country.trim().to_string(),
            is_default: input.is_default,
        };

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO consignee_addresses
                (id, consignee_id, label, address, state, state_code, pincode, country, is_default)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&address.id)
        .bind(&address.consignee_id)
        .bind(&address.label)
        .bind(&address.address)
        .bind(&address.state)
        .bind(&address.state_code)
        .bind(&address.pincode)
        .bind(&address.country)
        .bind(address.is_default)
        .execute(&mut *tx)
        .await?;

        if address.is_default {
            clear_other_defaults(&mut tx, consignee_id, &address.id).await?;
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(address)
    }

    /// Addresses of a consignee, default first.
    pub async fn list_addresses(&self, consignee_id: &str) -> DbResult<Vec<ConsigneeAddress>> {
        let rows: Vec<AddressRow> = sqlx::query_as(
            r#"
            SELECT id, consignee_id, label, address, state, state_code, pincode, country, is_default
            FROM consignee_addresses
            WHERE consignee_id = ?1
            ORDER BY is_default DESC, label
            "#,
        )
        .bind(consignee_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ConsigneeAddress::from).collect())
    }

    /// Gets one address by ID.
    pub async fn get_address(&self, address_id: &str) -> DbResult<Option<ConsigneeAddress>> {
        let row: Option<AddressRow> = sqlx::query_as(
            r#"
            SELECT id, consignee_id, label, address, state, state_code, pincode, country, is_default
            FROM consignee_addresses
            WHERE id = ?1
            "#,
        )
        .bind(address_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(ConsigneeAddress::from))
    }

    /// The default address of a consignee, if one is set.
    pub async fn default_address(&self, consignee_id: &str) -> DbResult<Option<ConsigneeAddress>> {
        let row: Option<AddressRow> = sqlx::query_as(
            r#"
            SELECT id, consignee_id, label, address, state, state_code, pincode, country, is_default
            FROM consignee_addresses
            WHERE consignee_id = ?1 AND is_default = 1
            "#,
        )
        .bind(consignee_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(ConsigneeAddress::from))
    }

    /// Replaces the fields of an address.
    pub async fn update_address(&self, address_id: &str, input: &AddressInput) -> DbResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        let consignee_id: Option<String> =
            sqlx::query_scalar("SELECT consignee_id FROM consignee_addresses WHERE id = ?1")
                .bind(address_id)
                .fetch_optional(&mut *tx)
                .await?;
        let consignee_id = consignee_id.ok_or_else(|| DbError::not_found("Address", address_id))?;

        sqlx::query(
            r#"
            UPDATE consignee_addresses
            SET label = ?2, address = ?3, state = ?4, state_code = ?5,
                pincode = ?6, country = ?7, is_default = ?8
            WHERE id = ?1
            "#,
        )
        .bind(address_id)
        .bind(input.label.trim())
        .bind(input.address.trim())
        .bind(input.state.trim())
        .bind(input.state_code.trim())
        .bind(input.pincode.trim())
        .bind(input.country.trim())
        .bind(input.is_default)
        .execute(&mut *tx)
        .await?;

        if input.is_default {
            clear_other_defaults(&mut tx, &consignee_id, address_id).await?;
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        Ok(())
    }

    /// Makes an address the consignee's only default.
    pub async fn set_default(&self, address_id: &str) -> DbResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        let consignee_id: Option<String> =
            sqlx::query_scalar("SELECT consignee_id FROM consignee_addresses WHERE id = ?1")
                .bind(address_id)
                .fetch_optional(&mut *tx)
                .await?;
        let consignee_id = consignee_id.ok_or_else(|| DbError::not_found("Address", address_id))?;

        sqlx::query("UPDATE consignee_addresses SET is_default = 1 WHERE id = ?1")
            .bind(address_id)
            .execute(&mut *tx)
            .await?;
        clear_other_defaults(&mut tx, &consignee_id, address_id).await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        debug!(address = %address_id, consignee = %consignee_id, "Default address changed");
        Ok(())
    }

    /// Deletes one address.
    pub async fn delete_address(&self, address_id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM consignee_addresses WHERE id = ?1")
            .bind(address_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Address", address_id));
        }
        Ok(())
    }
}

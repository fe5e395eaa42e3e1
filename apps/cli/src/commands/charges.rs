//! `sanbill charges` and the charge master edits.

use comfy_table::Cell;
use sanbill_core::GstRate;
use sanbill_db::{ChargeInput, DbError};
use tracing::info;

use super::{render, right, table, Context};
use crate::args::ChargeArgs;
use crate::error::CliResult;

/// Fields given to `edit-charge`; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct ChargeChanges {
    pub name: Option<String>,
    pub hsn_sac: Option<String>,
    pub currency: Option<String>,
    pub cgst: Option<GstRate>,
    pub sgst: Option<GstRate>,
}

pub async fn list(ctx: &Context) -> CliResult<String> {
    let charges = ctx.db.charges().list().await?;
    if charges.is_empty() {
        return Ok("No charges.\n".to_string());
    }

    let mut grid = table(&["ID", "CHARGE", "HSN/SAC", "CUR", "CGST", "SGST"]);
    for charge in &charges {
        grid.add_row(vec![
            Cell::new(&charge.id),
            Cell::new(&charge.charge_name),
            Cell::new(&charge.hsn_sac),
            Cell::new(&charge.currency),
            right(charge.cgst_rate),
            right(charge.sgst_rate),
        ]);
    }
    Ok(render(&grid))
}

pub async fn add(ctx: &Context, args: &ChargeArgs) -> CliResult<String> {
    let charge = ctx
        .db
        .charges()
        .add(&ChargeInput {
            charge_name: args.name.clone(),
            hsn_sac: args.hsn_sac.clone(),
            currency: args.currency.clone(),
            cgst_rate: args.cgst,
            sgst_rate: args.sgst,
        })
        .await?;

    info!(id = %charge.id, name = %charge.charge_name, "Charge added");
    Ok(format!("Added charge {} ({})\n", charge.charge_name, charge.id))
}

pub async fn edit(ctx: &Context, id: &str, changes: ChargeChanges) -> CliResult<String> {
    let current = ctx
        .db
        .charges()
        .get(id)
        .await?
        .ok_or_else(|| DbError::not_found("Charge", id))?;

    let input = ChargeInput {
        charge_name: changes.name.unwrap_or(current.charge_name),
        hsn_sac: changes.hsn_sac.unwrap_or(current.hsn_sac),
        currency: changes.currency.unwrap_or(current.currency),
        cgst_rate: changes.cgst.unwrap_or(current.cgst_rate),
        sgst_rate: changes.sgst.unwrap_or(current.sgst_rate),
    };
    ctx.db.charges().update(id, &input).await?;
    Ok(format!("Updated charge {}\n", input.charge_name.trim()))
}

pub async fn delete(ctx: &Context, id: &str) -> CliResult<String> {
    ctx.db.charges().delete(id).await?;
    Ok(format!("Deleted charge {id}\n"))
}

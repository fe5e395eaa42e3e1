//! Customers and their addresses.
//!
//! Customers and addresses are addressed by ID; `customers` and
//! `addresses` print the IDs to use.

use comfy_table::Cell;
use sanbill_core::ConsigneeAddress;
use sanbill_db::{AddressInput, DbError};
use tracing::info;

use super::{first_line, render, table, Context};
use crate::args::{AddressArgs, CustomerArgs};
use crate::error::CliResult;

/// Lists customers, optionally filtered by name, GSTIN or PAN.
pub async fn list(ctx: &Context, search: Option<&str>) -> CliResult<String> {
    let customers = ctx.db.consignees().list(search).await?;
    if customers.is_empty() {
        return Ok("No customers.\n".to_string());
    }

    let mut grid = table(&["ID", "NAME", "GSTIN", "PAN", "DEFAULT ADDRESS"]);
    for customer in &customers {
        let address = ctx
            .db
            .consignees()
            .default_address(&customer.id)
            .await?
            .map(|a| a.formatted().replace('\n', ", "))
            .unwrap_or_default();

        grid.add_row(vec![
            Cell::new(&customer.id),
            Cell::new(first_line(&customer.name)),
            Cell::new(customer.gstin.as_deref().unwrap_or("-")),
            Cell::new(customer.pan.as_deref().unwrap_or("-")),
            Cell::new(address),
        ]);
    }
    Ok(render(&grid))
}

pub async fn add(ctx: &Context, args: &CustomerArgs) -> CliResult<String> {
    let customer = ctx
        .db
        .consignees()
        .add(&args.name, args.gstin.as_deref(), args.pan.as_deref())
        .await?;

    info!(id = %customer.id, name = %customer.name, "Customer added");
    Ok(format!("Added customer {} ({})\n", customer.name, customer.id))
}

/// Changes the given fields; an empty GSTIN or PAN clears it.
pub async fn edit(
    ctx: &Context,
    id: &str,
    name: Option<String>,
    gstin: Option<String>,
    pan: Option<String>,
) -> CliResult<String> {
    let current = ctx
        .db
        .consignees()
        .get(id)
        .await?
        .ok_or_else(|| DbError::not_found("Customer", id))?;

    let name = name.unwrap_or(current.name);
    let gstin = gstin.or(current.gstin);
    let pan = pan.or(current.pan);

    ctx.db
        .consignees()
        .update(id, &name, gstin.as_deref(), pan.as_deref())
        .await?;
    Ok(format!("Updated customer {}\n", name.trim()))
}

/// Deletes a customer and its addresses. Jobs keep their data.
pub async fn delete(ctx: &Context, id: &str) -> CliResult<String> {
    ctx.db.consignees().delete(id).await?;
    Ok(format!("Deleted customer {id}\n"))
}

// -----------------------------------------------------------------------------
// Addresses
// -----------------------------------------------------------------------------

/// Street text typed on one command line uses a literal `\n` between lines.
fn address_input(args: &AddressArgs) -> AddressInput {
    AddressInput {
        label: args.label.clone(),
        address: args.address.replace("\\n", "\n"),
        state: args.state.clone(),
        state_code: args.state_code.clone(),
        pincode: args.pincode.clone(),
        country: args.country.clone(),
        is_default: args.is_default,
    }
}

fn keep_if_blank(new: &str, current: &str) -> String {
    if new.trim().is_empty() {
        current.to_string()
    } else {
        new.to_string()
    }
}

pub async fn addresses(ctx: &Context, customer_id: &str) -> CliResult<String> {
    ctx.db
        .consignees()
        .get(customer_id)
        .await?
        .ok_or_else(|| DbError::not_found("Customer", customer_id))?;

    let addresses = ctx.db.consignees().list_addresses(customer_id).await?;
    if addresses.is_empty() {
        return Ok("No addresses.\n".to_string());
    }

    let mut grid = table(&["ID", "LABEL", "DEFAULT", "ADDRESS"]);
    for address in &addresses {
        grid.add_row(vec![
            Cell::new(&address.id),
            Cell::new(&address.label),
            Cell::new(if address.is_default { "yes" } else { "" }),
            Cell::new(address.formatted()),
        ]);
    }
    Ok(render(&grid))
}

pub async fn add_address(ctx: &Context, customer_id: &str, args: &AddressArgs) -> CliResult<String> {
    ctx.db
        .consignees()
        .get(customer_id)
        .await?
        .ok_or_else(|| DbError::not_found("Customer", customer_id))?;

    let address = ctx
        .db
        .consignees()
        .add_address(customer_id, &address_input(args))
        .await?;
    Ok(format!("Added address {}\n", address.id))
}

pub async fn edit_address(ctx: &Context, address_id: &str, args: &AddressArgs) -> CliResult<String> {
    let current: ConsigneeAddress = ctx
        .db
        .consignees()
        .get_address(address_id)
        .await?
        .ok_or_else(|| DbError::not_found("Address", address_id))?;

    let given = address_input(args);
    let merged = AddressInput {
        label: keep_if_blank(&given.label, &current.label),
        address: keep_if_blank(&given.address, &current.address),
        state: keep_if_blank(&given.state, &current.state),
        state_code: keep_if_blank(&given.state_code, &current.state_code),
        pincode: keep_if_blank(&given.pincode, &current.pincode),
        country: keep_if_blank(&given.country, &current.country),
        is_default: given.is_default || current.is_default,
    };

    ctx.db.consignees().update_address(address_id, &merged).await?;
    Ok(format!("Updated address {address_id}\n"))
}

pub async fn delete_address(ctx: &Context, address_id: &str) -> CliResult<String> {
    ctx.db.consignees().delete_address(address_id).await?;
    Ok(format!("Deleted address {address_id}\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{context, row_with};
    use crate::error::CliError;

    fn head_office() -> AddressArgs {
        AddressArgs {
            label: "Head Office".into(),
            address: "1 Harbour Road".into(),
            state: "Maharashtra".into(),
            state_code: "27".into(),
            country: "India".into(),
            is_default: true,
            ..Default::default()
        }
    }

    async fn add_acme(ctx: &Context) -> String {
        let acme = ctx
            .db
            .consignees()
            .add("Acme Traders", Some("27AAPFU0939F1ZV"), None)
            .await
            .unwrap();
        acme.id
    }

    #[tokio::test]
    async fn test_list_with_default_address() {
        let ctx = context().await;
        assert_eq!(list(&ctx, None).await.unwrap(), "No customers.\n");

        let acme = add_acme(&ctx).await;
        add_address(&ctx, &acme, &head_office()).await.unwrap();
        ctx.db.consignees().add("Blue Coast Exports", None, None).await.unwrap();

        let out = list(&ctx, None).await.unwrap();
        assert_eq!(
            row_with(&out, "Acme Traders"),
            vec![
                acme.as_str(),
                "Acme Traders",
                "27AAPFU0939F1ZV",
                "-",
                "1 Harbour Road, Maharashtra (27), India"
            ]
        );
        assert!(out.contains("Blue Coast Exports"));

        let filtered = list(&ctx, Some("blue")).await.unwrap();
        assert!(filtered.contains("Blue Coast Exports"));
        assert!(!filtered.contains("Acme"));
    }

    #[tokio::test]
    async fn test_add_edit_delete_customer() {
        let ctx = context().await;
        let out = add(
            &ctx,
            &CustomerArgs {
                name: " Acme Traders ".into(),
                gstin: Some("27aapfu0939f1zv".into()),
                pan: None,
            },
        )
        .await
        .unwrap();
        assert!(out.starts_with("Added customer Acme Traders ("));

        let id = ctx.db.consignees().list(None).await.unwrap()[0].id.clone();

        edit(&ctx, &id, Some("Acme Traders Pvt Ltd".into()), None, Some("AAPFU0939F".into()))
            .await
            .unwrap();
        let stored = ctx.db.consignees().get(&id).await.unwrap().unwrap();
        assert_eq!(stored.name, "Acme Traders Pvt Ltd");
        assert_eq!(stored.gstin.as_deref(), Some("27AAPFU0939F1ZV"));
        assert_eq!(stored.pan.as_deref(), Some("AAPFU0939F"));

        edit(&ctx, &id, None, Some(String::new()), None).await.unwrap();
        let stored = ctx.db.consignees().get(&id).await.unwrap().unwrap();
        assert_eq!(stored.gstin, None);
        assert_eq!(stored.name, "Acme Traders Pvt Ltd");

        assert_eq!(delete(&ctx, &id).await.unwrap(), format!("Deleted customer {id}\n"));
        let err = edit(&ctx, &id, Some("Ghost".into()), None, None).await.unwrap_err();
        assert!(matches!(err, CliError::Db(DbError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_bad_gstin_rejected() {
        let ctx = context().await;
        let err = add(
            &ctx,
            &CustomerArgs {
                name: "Acme".into(),
                gstin: Some("27AAPF".into()),
                pan: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, CliError::Db(DbError::Validation(_))));
    }

    #[tokio::test]
    async fn test_address_lifecycle() {
        let ctx = context().await;
        let acme = add_acme(&ctx).await;

        let mut two_lines = head_office();
        two_lines.address = r"Unit 4\nDock Road".into();
        add_address(&ctx, &acme, &two_lines).await.unwrap();
        let depot = ctx
            .db
            .consignees()
            .add_address(
                &acme,
                &AddressInput {
                    label: "Depot".into(),
                    address: "Plot 9".into(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let head = ctx.db.consignees().default_address(&acme).await.unwrap().unwrap();
        assert_eq!(head.address, "Unit 4\nDock Road");

        edit_address(
            &ctx,
            &depot.id,
            &AddressArgs {
                pincode: "400001".into(),
                is_default: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let depot_now = ctx.db.consignees().get_address(&depot.id).await.unwrap().unwrap();
        assert_eq!(depot_now.label, "Depot");
        assert_eq!(depot_now.address, "Plot 9");
        assert_eq!(depot_now.pincode, "400001");
        assert!(depot_now.is_default);
        assert!(!ctx.db.consignees().get_address(&head.id).await.unwrap().unwrap().is_default);

        let out = addresses(&ctx, &acme).await.unwrap();
        assert_eq!(row_with(&out, "Depot")[2], "yes");

        delete_address(&ctx, &depot.id).await.unwrap();
        let out = addresses(&ctx, &acme).await.unwrap();
        assert!(!out.contains("Depot"));

        let err = edit_address(&ctx, &depot.id, &head_office()).await.unwrap_err();
        assert!(matches!(err, CliError::Db(DbError::NotFound { .. })));
        let err = add_address(&ctx, "missing", &head_office()).await.unwrap_err();
        assert!(matches!(err, CliError::Db(DbError::NotFound { .. })));
    }
}

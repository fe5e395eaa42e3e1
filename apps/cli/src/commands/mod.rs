//! # Commands
//!
//! One module per group of subcommands. Every command returns the text to
//! print on stdout; logging goes to stderr.
//!
//! ```text
//! Cli::try_parse_from ──► Command ──► execute(command, &Context) ──► String
//!                                         │
//!                                         ├── calc.rs        (no database)
//!                                         ├── numbering.rs   next-number
//!                                         ├── jobs.rs        jobs, new-job, close-job
//!                                         ├── customers.rs   customers, addresses and their edits
//!                                         ├── charges.rs     charge master and its edits
//!                                         ├── documents.rs   save, list, show, delete
//!                                         └── status.rs      status
//! ```

pub mod calc;
pub mod charges;
pub mod customers;
pub mod documents;
pub mod jobs;
pub mod numbering;
pub mod status;

use comfy_table::{Cell, CellAlignment, Table};
use sanbill_db::Database;

use crate::args::Command;
use crate::config::AppConfig;
use crate::error::{CliError, CliResult};

/// What a command runs against.
#[derive(Debug, Clone)]
pub struct Context {
    pub db: Database,
    pub config: AppConfig,
}

/// Runs a command that needs the database.
pub async fn execute(command: Command, ctx: &Context) -> CliResult<String> {
    match command {
        Command::Calc(args) => Ok(calc::run(&args)),
        Command::NextNumber { series } => numbering::next_number(ctx, series.into()).await,
        Command::Jobs { open } => jobs::list(ctx, open).await,
        Command::NewJob(args) => jobs::create(ctx, &args).await,
        Command::CloseJob { job_no } => jobs::close(ctx, &job_no).await,
        Command::Customers { search } => customers::list(ctx, search.as_deref()).await,
        Command::AddCustomer(args) => customers::add(ctx, &args).await,
        Command::EditCustomer {
            id,
            name,
            gstin,
            pan,
        } => customers::edit(ctx, &id, name, gstin, pan).await,
        Command::DeleteCustomer { id } => customers::delete(ctx, &id).await,
        Command::Addresses { customer_id } => customers::addresses(ctx, &customer_id).await,
        Command::AddAddress {
            customer_id,
            address,
        } => customers::add_address(ctx, &customer_id, &address).await,
        Command::EditAddress {
            address_id,
            address,
        } => customers::edit_address(ctx, &address_id, &address).await,
        Command::DeleteAddress { address_id } => customers::delete_address(ctx, &address_id).await,
        Command::Charges => charges::list(ctx).await,
        Command::AddCharge(args) => charges::add(ctx, &args).await,
        Command::EditCharge {
            id,
            name,
            hsn_sac,
            currency,
            cgst,
            sgst,
        } => {
            let changes = charges::ChargeChanges {
                name,
                hsn_sac,
                currency,
                cgst,
                sgst,
            };
            charges::edit(ctx, &id, changes).await
        }
        Command::DeleteCharge { id } => charges::delete(ctx, &id).await,
        Command::Save { file } => documents::save_file(ctx, &file).await,
        Command::List { series } => documents::list(ctx, series.map(Into::into)).await,
        Command::Show { document_number } => documents::show(ctx, &document_number).await,
        Command::Delete { document_number } => documents::delete(ctx, &document_number).await,
        Command::Status => status::run(ctx).await,
    }
}

/// Runs a command that does not touch the database.
pub fn execute_offline(command: &Command) -> CliResult<String> {
    match command {
        Command::Calc(args) => Ok(calc::run(args)),
        _ => Err(CliError::usage("this command needs a database")),
    }
}

/// First non-blank line of a multi-line field.
pub(crate) fn first_line(text: &str) -> &str {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("")
}

/// A table with the given column headings.
pub(crate) fn table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table.set_header(header.iter().map(|h| Cell::new(h)).collect::<Vec<_>>());
    table
}

/// A right-aligned cell, for amounts and rates.
pub(crate) fn right(text: impl ToString) -> Cell {
    Cell::new(text.to_string()).set_alignment(CellAlignment::Right)
}

/// Renders a table followed by a newline.
pub(crate) fn render(table: &Table) -> String {
    format!("{table}\n")
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::Context;
    use crate::config::AppConfig;
    use sanbill_db::{Database, DbConfig};

    pub async fn context() -> Context {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        Context {
            db,
            config: AppConfig::default(),
        }
    }

    /// Cells of the table row that contains `needle`, trimmed.
    pub fn row_with<'a>(out: &'a str, needle: &str) -> Vec<&'a str> {
        out.lines()
            .find(|line| line.contains(needle))
            .map(|line| {
                line.trim_matches('|')
                    .split('|')
                    .map(str::trim)
                    .collect()
            })
            .unwrap_or_default()
    }
}

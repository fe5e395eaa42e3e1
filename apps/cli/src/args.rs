//! # Argument Parsing
//!
//! `clap` derive definitions for the `sanbill` binary.
//!
//! `--config` and `--db` are global, so they may appear before or after the
//! subcommand.

use clap::{Args, Parser, Subcommand, ValueEnum};
use sanbill_core::amount::parse_decimal;
use sanbill_core::validation::validate_gst_rate;
use sanbill_core::{ConsignmentDetails, DocumentKind, GstRate, ShipmentDetails};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "sanbill",
    version,
    about = "GST invoices and debit notes for freight-forwarding jobs",
    arg_required_else_help = true
)]
pub struct Cli {
    /// Config file (default: platform config dir)
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Database file (overrides config and SANBILL_DB_PATH)
    #[arg(short, long, global = true, value_name = "PATH")]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Document series selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Series {
    #[value(alias = "inv")]
    Invoice,
    #[value(alias = "dn")]
    DebitNote,
}

impl From<Series> for DocumentKind {
    fn from(series: Series) -> Self {
        match series {
            Series::Invoice => DocumentKind::Invoice,
            Series::DebitNote => DocumentKind::DebitNote,
        }
    }
}

/// A GST percentage: plain decimal, optional `%`, within 0..=100.
fn gst_rate(text: &str) -> Result<GstRate, String> {
    let percent = parse_decimal(text.trim().trim_end_matches('%'))
        .ok_or_else(|| format!("'{text}' is not a number"))?;
    let rate = GstRate::from_percent(percent);
    validate_gst_rate(rate).map_err(|err| err.to_string())?;
    Ok(rate)
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Compute one GST line item
    Calc(CalcArgs),

    /// Allocate the next document number in the current fiscal year
    NextNumber {
        #[arg(value_enum)]
        series: Series,
    },

    /// List jobs
    Jobs {
        /// Only jobs that can still be billed
        #[arg(long)]
        open: bool,
    },

    /// Open a job
    NewJob(NewJobArgs),

    /// Close a job
    CloseJob { job_no: String },

    /// List customers
    Customers {
        /// Filter by name, GSTIN or PAN
        #[arg(long)]
        search: Option<String>,
    },

    /// Add a customer
    AddCustomer(CustomerArgs),

    /// Change a customer's name, GSTIN or PAN
    EditCustomer {
        id: String,
        #[arg(long)]
        name: Option<String>,
        /// GSTIN; pass an empty value to clear it
        #[arg(long)]
        gstin: Option<String>,
        /// PAN; pass an empty value to clear it
        #[arg(long)]
        pan: Option<String>,
    },

    /// Delete a customer and its addresses
    DeleteCustomer { id: String },

    /// List a customer's addresses
    Addresses { customer_id: String },

    /// Add an address to a customer
    AddAddress {
        customer_id: String,
        #[command(flatten)]
        address: AddressArgs,
    },

    /// Change an address; blank fields keep their current value
    EditAddress {
        address_id: String,
        #[command(flatten)]
        address: AddressArgs,
    },

    /// Delete an address
    DeleteAddress { address_id: String },

    /// List the charge master
    Charges,

    /// Add a charge to the charge master
    AddCharge(ChargeArgs),

    /// Change a charge
    EditCharge {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        hsn_sac: Option<String>,
        #[arg(long)]
        currency: Option<String>,
        #[arg(long, value_parser = gst_rate)]
        cgst: Option<GstRate>,
        #[arg(long, value_parser = gst_rate)]
        sgst: Option<GstRate>,
    },

    /// Delete a charge
    DeleteCharge { id: String },

    /// Validate, number and store a document draft
    Save {
        #[arg(value_name = "FILE.json")]
        file: PathBuf,
    },

    /// List saved documents, newest first
    List {
        #[arg(value_enum)]
        series: Option<Series>,
    },

    /// Print a saved document
    Show { document_number: String },

    /// Delete a saved document and its items
    Delete { document_number: String },

    /// Database and counter status
    Status,
}

impl Command {
    /// Commands that work without opening the database.
    pub fn needs_database(&self) -> bool {
        !matches!(self, Command::Calc(_))
    }
}

/// Raw text of a `calc` invocation. Parsed with parse-or-zero later.
#[derive(Debug, Clone, Default, PartialEq, Eq, Args)]
pub struct CalcArgs {
    #[arg(long, allow_hyphen_values = true)]
    pub rate: String,
    #[arg(long, allow_hyphen_values = true)]
    pub qty: String,
    /// Taxable value that replaces rate x qty
    #[arg(long, allow_hyphen_values = true)]
    pub taxable: Option<String>,
    #[arg(long, default_value = "", allow_hyphen_values = true)]
    pub cgst: String,
    #[arg(long, default_value = "", allow_hyphen_values = true)]
    pub sgst: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct CustomerArgs {
    pub name: String,
    #[arg(long)]
    pub gstin: Option<String>,
    #[arg(long)]
    pub pan: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Args)]
pub struct AddressArgs {
    #[arg(long, default_value = "")]
    pub label: String,
    /// Street lines; `\n` separates lines
    #[arg(long, default_value = "")]
    pub address: String,
    #[arg(long, default_value = "")]
    pub state: String,
    #[arg(long, default_value = "")]
    pub state_code: String,
    #[arg(long, default_value = "")]
    pub pincode: String,
    #[arg(long, default_value = "")]
    pub country: String,
    /// Make this the customer's default address
    #[arg(long = "default")]
    pub is_default: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct ChargeArgs {
    pub name: String,
    #[arg(long, default_value = "")]
    pub hsn_sac: String,
    /// Blank means the default currency
    #[arg(long, default_value = "")]
    pub currency: String,
    #[arg(long, value_parser = gst_rate, default_value = "0")]
    pub cgst: GstRate,
    #[arg(long, value_parser = gst_rate, default_value = "0")]
    pub sgst: GstRate,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Args)]
pub struct NewJobArgs {
    pub job_no: String,

    /// Customer ID the job is billed to
    #[arg(long)]
    pub customer: Option<String>,

    #[arg(long, default_value = "")]
    pub shipper: String,
    #[arg(long, default_value = "")]
    pub consignee: String,
    #[arg(long, default_value = "")]
    pub pol: String,
    #[arg(long, default_value = "")]
    pub pod: String,
    #[arg(long, default_value = "")]
    pub vessel_flight: String,
    #[arg(long, default_value = "")]
    pub etd: String,
    #[arg(long, default_value = "")]
    pub eta: String,
    #[arg(long, default_value = "")]
    pub mbl_no: String,
    #[arg(long, default_value = "")]
    pub hbl_no: String,

    #[arg(long, default_value = "")]
    pub gross_weight: String,
    #[arg(long, default_value = "")]
    pub net_weight: String,
    #[arg(long, default_value = "")]
    pub volume_cbm: String,
    #[arg(long, default_value = "")]
    pub packages: String,
    #[arg(long, default_value = "")]
    pub be_no: String,
    #[arg(long, default_value = "")]
    pub be_date: String,
    #[arg(long, default_value = "")]
    pub igm_no: String,
    #[arg(long, default_value = "")]
    pub igm_date: String,
    #[arg(long, default_value = "")]
    pub item_no: String,
    #[arg(long, default_value = "")]
    pub exchange_rate: String,
    #[arg(long, default_value = "")]
    pub ref_no: String,
}

impl NewJobArgs {
    pub fn shipment(&self) -> ShipmentDetails {
        ShipmentDetails {
            shipper: self.shipper.clone(),
            consignee: self.consignee.clone(),
            pol: self.pol.clone(),
            pod: self.pod.clone(),
            vessel_flight: self.vessel_flight.clone(),
            etd: self.etd.clone(),
            eta: self.eta.clone(),
            mbl_no: self.mbl_no.clone(),
            hbl_no: self.hbl_no.clone(),
        }
    }

    pub fn consignment(&self) -> ConsignmentDetails {
        ConsignmentDetails {
            gross_weight: self.gross_weight.clone(),
            net_weight: self.net_weight.clone(),
            volume_cbm: self.volume_cbm.clone(),
            packages: self.packages.clone(),
            be_no: self.be_no.clone(),
            be_date: self.be_date.clone(),
            igm_no: self.igm_no.clone(),
            igm_date: self.igm_date.clone(),
            item_no: self.item_no.clone(),
            exchange_rate: self.exchange_rate.clone(),
            ref_no: self.ref_no.clone(),
        }
    }
}

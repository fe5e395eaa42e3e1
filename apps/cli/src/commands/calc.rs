//! `sanbill calc`: one line item through the GST calculator.
//!
//! The arguments go through the same parse-or-zero path as a grid row, so
//! `--rate abc` computes with a rate of 0 instead of failing.

use sanbill_core::line_item::LineDraft;
use sanbill_core::Amount;

use crate::args::CalcArgs;

fn row(label: &str, value: Amount) -> String {
    format!("{:<14}{:>14}\n", label, value.to_string())
}

/// Computes and renders the line.
pub fn run(args: &CalcArgs) -> String {
    let draft = LineDraft {
        rate: args.rate.clone(),
        qty: args.qty.clone(),
        taxable_override: args.taxable.clone(),
        cgst_rate: args.cgst.clone(),
        sgst_rate: args.sgst.clone(),
        ..LineDraft::default()
    };
    let input = draft.to_input();
    let line = input.compute();

    let mut out = String::new();
    out.push_str(&row("Amount", line.amount));
    out.push_str(&row("Taxable", line.taxable_amount));
    out.push_str(&row(&format!("CGST @ {}", input.cgst_rate), line.cgst_amount));
    out.push_str(&row(&format!("SGST @ {}", input.sgst_rate), line.sgst_amount));
    out.push_str(&row("Total", line.total));
    out
}

use clap::Parser;
use serde::Serialize;

use crate::{
    cli::{OutputArgs, input::InputArgs},
    prelude::*,
    table::Reduction,
    tables::build_reduction_table,
};

#[derive(Parser)]
pub struct ReduceArgs {
    #[clap(flatten)]
    input: InputArgs,

    /// Column to reduce, text and empty cells are skipped.
    #[clap(long, env = "FLOWPEAK_COLUMN")]
    column: String,

    #[clap(long, value_enum, env = "FLOWPEAK_REDUCTION")]
    reduction: Reduction,

    #[clap(flatten)]
    output: OutputArgs,
}

#[derive(Serialize)]
struct Reduced<'a> {
    column: &'a str,
    reduction: Reduction,
    value: Option<f64>,
}

impl ReduceArgs {
    pub fn run(self) -> Result {
        let table = self.input.load()?;
        let value = table.reduce(&self.column, self.reduction)?;
        info!(column = %self.column, reduction = ?self.reduction, value, "reduced");
        let reduced = Reduced { column: &self.column, reduction: self.reduction, value };
        self.output.print(&reduced, || build_reduction_table(&self.column, self.reduction, value))
    }
}

use std::{fs::File, io, path::PathBuf};

use clap::Parser;

use crate::{
    cli::input::InputArgs,
    prelude::*,
    table::BinaryOp,
};

#[derive(Parser)]
pub struct CombineArgs {
    #[clap(flatten)]
    input: InputArgs,

    #[clap(long)]
    lhs: String,

    #[clap(long, value_enum)]
    op: BinaryOp,

    #[clap(long)]
    rhs: String,

    /// Name of the new column.
    #[clap(long)]
    name: String,

    /// Write the table here instead of the standard output.
    #[clap(long = "output-path", env = "FLOWPEAK_OUTPUT_PATH")]
    output_path: Option<PathBuf>,
}

impl CombineArgs {
    pub fn run(self) -> Result {
        let mut table = self.input.load()?;
        table.derive_column(&self.name, &self.lhs, self.op, &self.rhs)?;
        match &self.output_path {
            Some(path) => {
                let file = File::create(path)
                    .with_context(|| format!("failed to create `{}`", path.display()))?;
                table.write_csv(file, self.input.delimiter)?;
                info!(path = %path.display(), n_rows = table.len(), "written");
            }
            None => table.write_csv(io::stdout().lock(), self.input.delimiter)?,
        }
        Ok(())
    }
}

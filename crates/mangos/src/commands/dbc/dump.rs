use clap::Args;
use itertools::Itertools;
use mangos_dbc::{types::FIELD_SIZE, DbcTable};
use miette::{Context, Result};
use owo_colors::OwoColorize;
use std::path::PathBuf;

#[derive(Args)]
pub struct DumpArgs {
    /// An input DBC file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// Stop after this many rows
    #[arg(short, long)]
    limit: Option<usize>,

    /// A column to print as a string rather than an integer
    #[arg(short, long = "strings", value_name = "COL")]
    strings: Vec<usize>,
}

impl DumpArgs {
    pub fn handle(&self) -> Result<()> {
        let table = DbcTable::open(&self.file)
            .context(format!("path: {}", &self.file.display()))?;

        let header = table.header();
        println!(
            "{} records, {} fields, {} bytes per record, {} bytes of strings",
            header.record_count, header.field_count, header.record_size, header.string_block_size
        );

        let columns = table.field_count().min(table.record_size() / FIELD_SIZE);
        for row in table.rows().take(self.limit.unwrap_or(usize::MAX)) {
            let fields = (0..columns)
                .map(|column| {
                    if self.strings.contains(&column) {
                        row.read_string(column).map(|s| format!("{s:?}"))
                    } else {
                        row.read_int(column).map(|v| v.to_string())
                    }
                })
                .collect::<Result<Vec<_>, _>>()
                .context(format!("row {}", row.index()))?;

            println!("{:>6}: {}", row.index().dimmed(), fields.iter().join(" | "));
        }

        Ok(())
    }
}

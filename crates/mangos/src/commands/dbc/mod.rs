pub mod dump;
pub mod extract;

#[derive(clap::Subcommand)]
pub enum DbcCommands {
    /// Extract every DBC table from the client archives and read the world tables
    Extract(extract::ExtractArgs),
    /// Print the rows of a DBC table
    Dump(dump::DumpArgs),
}

impl DbcCommands {
    pub fn handle(&self) -> miette::Result<()> {
        match self {
            DbcCommands::Extract(extract) => extract.handle(),
            DbcCommands::Dump(dump) => dump.handle(),
        }
    }
}

pub mod dbc;
pub mod mpq;

#[derive(clap::Subcommand)]
pub enum Commands {
    /// Handle MPQ archives
    Mpq {
        #[command(subcommand)]
        command: mpq::MpqCommands,
    },
    /// Handle DBC tables
    Dbc {
        #[command(subcommand)]
        command: dbc::DbcCommands,
    },
}

impl Commands {
    pub fn handle(&self) -> miette::Result<()> {
        match self {
            Commands::Mpq { command } => command.handle(),
            Commands::Dbc { command } => command.handle(),
        }
    }
}

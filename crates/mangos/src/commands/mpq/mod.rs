pub mod extract;
pub mod list;

#[derive(clap::Subcommand)]
pub enum MpqCommands {
    /// List the members of an MPQ archive
    List(list::ListArgs),
    /// Extract an MPQ archive into a directory
    Extract(extract::ExtractArgs),
}

impl MpqCommands {
    pub fn handle(&self) -> miette::Result<()> {
        match self {
            MpqCommands::List(list) => list.handle(),
            MpqCommands::Extract(extract) => extract.handle(),
        }
    }
}

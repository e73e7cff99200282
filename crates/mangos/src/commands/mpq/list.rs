use clap::Args;
use mangos_mpq::{MemberRef, MpqArchive};
use miette::Result;
use owo_colors::OwoColorize;
use std::path::PathBuf;

use crate::extract::has_suffix;

#[derive(Args)]
pub struct ListArgs {
    /// An input MPQ file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// Only list named members ending with this suffix, ignoring case
    #[arg(short, long)]
    suffix: Option<String>,

    /// A member name the archive's listfile is missing
    #[arg(short, long = "name", value_name = "NAME")]
    names: Vec<String>,
}

impl ListArgs {
    pub fn handle(&self) -> Result<()> {
        let mut mpq = MpqArchive::open(&self.file)?;
        let resolved = mpq.add_names(&self.names);
        if !self.names.is_empty() {
            println!("resolved {} of {} extra names", resolved, self.names.len());
        }

        let members: Vec<&MemberRef> = match &self.suffix {
            Some(suffix) => mpq
                .list_members(|name| has_suffix(name, suffix))
                .collect(),
            None => mpq.members().collect(),
        };

        println!(
            "{:>6} {:>10} {:>10}  {:<32} {}",
            "index".bold(),
            "packed".bold(),
            "size".bold(),
            "flags".bold(),
            "name".bold()
        );
        for member in &members {
            let name = match member.name() {
                Some(name) => name.to_owned(),
                None => format!("<unnamed #{}>", member.index()).dimmed().to_string(),
            };
            println!(
                "{:>6} {:>10} {:>10}  {:<32} {}",
                member.index(),
                member.compressed_size(),
                member.size(),
                member.flags().to_string(),
                name
            );
        }

        let total: u64 = members.iter().map(|m| m.size()).sum();
        println!("{} members, {} bytes", members.len(), total);

        Ok(())
    }
}

use clap::Args;
use mangos_mpq::MpqArchive;
use miette::{Context, Result};
use owo_colors::OwoColorize;
use std::path::PathBuf;
use tracing::{error, info};

use crate::extract::{create_output_dir, has_suffix, member_path, write_member};

#[derive(Args)]
pub struct ExtractArgs {
    /// An input MPQ file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// A target directory
    #[arg(short, long, value_name = "DIR")]
    directory: PathBuf,

    /// Only extract members ending with this suffix, ignoring case
    #[arg(short, long)]
    suffix: Option<String>,

    /// Allow overwriting the target
    #[arg(long, default_value_t = false)]
    overwrite: bool,
}

impl ExtractArgs {
    pub fn handle(&self) -> Result<()> {
        let mpq = MpqArchive::open(&self.file)
            .context(format!("path: {}", &self.file.display()))?;

        let suffix = self.suffix.as_deref().unwrap_or("");
        let mut extracted = 0usize;
        let mut failed = 0usize;

        for member in mpq.list_members(|name| has_suffix(name, suffix)) {
            let name = member.display_name();
            let outcome = member_path(&name).and_then(|relative| {
                let path = self.directory.join(relative);
                if let Some(parent) = path.parent() {
                    create_output_dir(parent)?;
                }
                info!("writing {}", path.display());
                write_member(&mpq, member, &path, self.overwrite)
            });

            match outcome {
                Ok(_) => extracted += 1,
                Err(e) => {
                    error!("unable to extract {}: {}", name, e);
                    failed += 1;
                }
            }
        }

        println!(
            "{} {} members extracted, {} failed",
            "Done.".green(),
            extracted,
            failed
        );

        Ok(())
    }
}

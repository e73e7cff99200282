use clap::Args;
use indexmap::IndexMap;
use mangos_mpq::{MemberRef, MpqArchive};
use miette::{IntoDiagnostic, Result};
use owo_colors::OwoColorize;
use rayon::prelude::*;
use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};
use tracing::{debug, error, info};

use crate::{
    error::Error,
    extract::{create_output_dir, file_name, has_suffix, write_member},
    tables::WorldTables,
};

/// Archives of a 1.12 client, base archives first
pub const DEFAULT_ARCHIVES: [&str; 5] = [
    "terrain.MPQ",
    "dbc.MPQ",
    "misc.MPQ",
    "patch.MPQ",
    "patch-2.MPQ",
];

const TABLE_SUFFIX: &str = ".dbc";

type Archive = MpqArchive<BufReader<File>>;

#[derive(Args)]
pub struct ExtractArgs {
    /// The client's data directory
    #[arg(short, long, value_name = "DIR", default_value = "Data")]
    data: PathBuf,

    /// The directory the dbc folder is created in
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    output: PathBuf,

    /// An archive inside the data directory, later archives override earlier ones
    #[arg(short, long = "archive", value_name = "NAME", default_values = DEFAULT_ARCHIVES)]
    archives: Vec<String>,

    /// Allow overwriting previously extracted tables
    #[arg(long, default_value_t = false)]
    overwrite: bool,

    /// Write the world tables to this file as JSON
    #[arg(long, value_name = "FILE")]
    json: Option<PathBuf>,
}

impl ExtractArgs {
    pub fn handle(&self) -> Result<()> {
        let archives = self.open_archives()?;

        let dbc_dir = self.output.join("dbc");
        create_output_dir(&dbc_dir)?;
        info!("created extract folder {}", dbc_dir.display());

        let (extracted, failed) = extract_tables(&archives, &dbc_dir, self.overwrite);
        println!(
            "{} {} dbc files extracted, {} failed",
            "Done.".green(),
            extracted,
            failed
        );

        let mut world = WorldTables::default();
        for (name, outcome) in world.load_dir(&dbc_dir) {
            match outcome {
                Ok(rows) => println!("Read {}: {} rows", name.bold(), rows),
                Err(e) => error!("unable to read {}: {}", name, e),
            }
        }
        println!(
            "{} maps, {} areas (max id {}), {} liquid types loaded",
            world.maps.len(),
            world.areas.len(),
            world.max_area_id.map_or("-".to_owned(), |id| id.to_string()),
            world.liquid_types.len()
        );

        if let Some(path) = &self.json {
            let out = File::create(path).into_diagnostic()?;
            serde_json::to_writer_pretty(out, &world).into_diagnostic()?;
            info!("wrote {}", path.display());
        }

        Ok(())
    }

    fn open_archives(&self) -> Result<Vec<(&str, Archive)>, Error> {
        if !self.data.is_dir() {
            return Err(Error::MissingDataDir(self.data.clone()));
        }

        let paths = self
            .archives
            .iter()
            .map(|name| {
                let path = self.data.join(name);
                if path.is_file() {
                    Ok((name.as_str(), path))
                } else {
                    Err(Error::MissingArchive(path))
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        paths
            .into_iter()
            .map(|(name, path)| {
                let archive = MpqArchive::open(&path)
                    .map_err(|source| Error::OpenArchive { path, source })?;
                info!("loaded archive {}", name);
                Ok((name, archive))
            })
            .collect()
    }
}

/// Write every table of `archives` flat into `dir`, returning how many succeeded and failed.
///
/// When several archives hold a table with the same file name, the last archive wins.
fn extract_tables(archives: &[(&str, Archive)], dir: &Path, overwrite: bool) -> (usize, usize) {
    let selected = select_tables(archives);
    debug!(tables = selected.len(), "selected tables");

    let outcomes: Vec<bool> = selected
        .into_values()
        .collect::<Vec<_>>()
        .into_par_iter()
        .map(|(archive, member, file_name)| {
            let path = dir.join(file_name);
            match write_member(&archives[archive].1, member, &path, overwrite) {
                Ok(_) => true,
                Err(e) => {
                    error!(
                        "unable to extract {} from {}: {}",
                        member.display_name(),
                        archives[archive].0,
                        e
                    );
                    false
                }
            }
        })
        .collect();

    let extracted = outcomes.iter().filter(|ok| **ok).count();
    (extracted, outcomes.len() - extracted)
}

/// Pick the member to extract for every table file name, keyed by lower case file name
fn select_tables<'a, R>(
    archives: &'a [(&str, MpqArchive<R>)],
) -> IndexMap<String, (usize, &'a MemberRef, &'a str)> {
    let mut selected = IndexMap::new();
    for (index, (_, archive)) in archives.iter().enumerate() {
        for member in archive.list_members(|name| has_suffix(name, TABLE_SUFFIX)) {
            let Some(base) = member.name().and_then(file_name) else {
                continue;
            };
            selected.insert(base.to_ascii_lowercase(), (index, member, base));
        }
    }
    selected
}

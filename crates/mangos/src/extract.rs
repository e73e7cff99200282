//! Writing archive members to disk.

use mangos_mpq::{MemberRef, MpqArchive};
use std::{
    fs::{self, File},
    io::{self, BufWriter, Read, Seek, Write},
    path::{Path, PathBuf},
};
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Whether `name` ends with `suffix`, ignoring ASCII case
pub fn has_suffix(name: &str, suffix: &str) -> bool {
    let (name, suffix) = (name.as_bytes(), suffix.as_bytes());
    name.len() >= suffix.len() && name[name.len() - suffix.len()..].eq_ignore_ascii_case(suffix)
}

/// The part of a member name after its last path separator
pub fn file_name(name: &str) -> Option<&str> {
    name.rsplit(['\\', '/'])
        .next()
        .filter(|base| !matches!(*base, "" | "." | ".."))
}

/// Turn a member name into a path relative to the output directory.
///
/// Both separators are accepted. Names that are absolute, carry a drive prefix or climb out
/// with `..` are refused.
pub fn member_path(name: &str) -> Result<PathBuf> {
    let unsafe_name = || Error::UnsafeName(name.to_owned());

    if name.starts_with(['\\', '/']) {
        return Err(unsafe_name());
    }

    let mut path = PathBuf::new();
    for part in name.split(['\\', '/']) {
        match part {
            "" | "." => continue,
            ".." => return Err(unsafe_name()),
            part if part.contains(':') => return Err(unsafe_name()),
            part => path.push(part),
        }
    }

    if path.as_os_str().is_empty() {
        return Err(unsafe_name());
    }
    Ok(path)
}

/// Create `path` and any missing parents.
///
/// A permission problem is reported apart from any other failure.
pub fn create_output_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|source| create_error(path, source))
}

fn create_error(path: &Path, source: io::Error) -> Error {
    match source.kind() {
        io::ErrorKind::PermissionDenied => Error::PermissionDenied {
            path: path.to_owned(),
        },
        io::ErrorKind::AlreadyExists => Error::AlreadyExists {
            path: path.to_owned(),
        },
        _ => Error::Create {
            path: path.to_owned(),
            source,
        },
    }
}

fn create_file(path: &Path, overwrite: bool) -> Result<File> {
    let file = if overwrite {
        File::create(path)
    } else {
        File::create_new(path)
    };
    file.map_err(|source| create_error(path, source))
}

/// Stream `member` into a new file at `path`, returning the number of bytes written.
///
/// A file that could not be written completely is removed again.
pub fn write_member<R: Read + Seek>(
    archive: &MpqArchive<R>,
    member: &MemberRef,
    path: &Path,
    overwrite: bool,
) -> Result<u64> {
    let mut stream = archive.open_member(member)?;
    let mut out = BufWriter::new(create_file(path, overwrite)?);

    let written = io::copy(&mut stream, &mut out).and_then(|written| {
        out.flush()?;
        Ok(written)
    });

    match written {
        Ok(written) => {
            debug!(member = %member.display_name(), path = %path.display(), written, "extracted");
            Ok(written)
        }
        Err(e) => {
            drop(out);
            if let Err(remove) = fs::remove_file(path) {
                warn!("unable to remove partial file {}: {}", path.display(), remove);
            }
            Err(stream_error(e))
        }
    }
}

/// Recover the archive error a member stream wrapped into an [`io::Error`]
fn stream_error(e: io::Error) -> Error {
    let from_archive = e
        .get_ref()
        .is_some_and(|inner| inner.is::<mangos_mpq::error::Error>());
    if !from_archive {
        return Error::IOError(e);
    }

    e.into_inner()
        .and_then(|inner| inner.downcast::<mangos_mpq::error::Error>().ok())
        .map_or_else(
            || Error::IOError(io::ErrorKind::InvalidData.into()),
            |archive| Error::Archive(*archive),
        )
}

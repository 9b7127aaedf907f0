//! Tar archive unpacking.
//!
//! Two kinds of container are handled: the top-level archive handed to the
//! tool (`.tar`, `.tar.gz` or `.tgz`) and the `.tar.gz` archives found inside
//! it. Gzip is recognised from the stream's magic bytes rather than trusted
//! from the name.
//!
//! Member paths are checked before anything is written: absolute paths and
//! `..` components fail the whole archive with
//! [`SearchError::UnsafeArchivePath`]. Regular files, directories and hard
//! links to already unpacked members are materialised; symlinks and device
//! nodes are skipped.
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Component, Path, PathBuf};
use tar::Archive;
use tracing::{debug, trace};

use crate::classify::{is_nested_archive, walk_files};
use crate::errors::{SearchError, SearchResult};

/// Gzip magic bytes (RFC 1952)
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

const TOP_LEVEL_SUFFIXES: [&str; 3] = [".tar", ".tar.gz", ".tgz"];

/// Container format of a tar archive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    PlainTar,
    TarGz,
}

impl ArchiveKind {
    /// Detect compression from the first bytes of the file
    pub fn from_magic_bytes(bytes: &[u8]) -> Self {
        if bytes.starts_with(&GZIP_MAGIC) {
            Self::TarGz
        } else {
            Self::PlainTar
        }
    }

    /// Detect compression by peeking at the file
    pub fn detect(path: &Path) -> SearchResult<Self> {
        let mut reader = BufReader::new(File::open(path)?);
        Ok(Self::from_magic_bytes(reader.fill_buf()?))
    }
}

/// Whether `path` names a file that can be unpacked as the top-level input
pub fn is_top_level_archive(path: &Path) -> bool {
    let name = match path.file_name() {
        Some(name) => name.to_string_lossy(),
        None => return false,
    };
    path.is_file() && TOP_LEVEL_SUFFIXES.iter().any(|s| name.ends_with(s))
}

/// Rejects member paths that would land outside the destination
fn check_member_path(archive: &Path, member: &Path) -> SearchResult<()> {
    let escapes = member.components().any(|c| {
        matches!(
            c,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    });
    if escapes {
        Err(SearchError::unsafe_archive_path(archive, member))
    } else {
        Ok(())
    }
}

/// Counts the bytes pulled through a reader
struct CountingReader<R> {
    inner: R,
    bytes: u64,
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.bytes += n as u64;
        Ok(n)
    }
}

fn unpack_entries<R: Read>(archive_path: &Path, reader: R, dest: &Path) -> SearchResult<usize> {
    let mut archive = Archive::new(CountingReader {
        inner: reader,
        bytes: 0,
    });
    let mut written = 0;

    let entries = archive
        .entries()
        .map_err(|e| SearchError::extraction(archive_path, e))?;
    for entry in entries {
        let mut entry = entry.map_err(|e| SearchError::extraction(archive_path, e))?;
        let member = entry
            .path()
            .map_err(|e| SearchError::extraction(archive_path, e))?
            .into_owned();
        check_member_path(archive_path, &member)?;

        let entry_type = entry.header().entry_type();
        if entry_type.is_hard_link() {
            let target = entry
                .link_name()
                .map_err(|e| SearchError::extraction(archive_path, e))?
                .map(|t| t.into_owned());
            let Some(target) = target else {
                return Err(SearchError::extraction(
                    archive_path,
                    format!("hard link {} has no target", member.display()),
                ));
            };
            check_member_path(archive_path, &target)?;
            if !dest.join(&target).is_file() {
                debug!(
                    "Skipping hard link {} to missing {} in {}",
                    member.display(),
                    target.display(),
                    archive_path.display()
                );
                continue;
            }
        } else if !(entry_type.is_file() || entry_type.is_dir()) {
            debug!(
                "Skipping {:?} entry {} in {}",
                entry_type,
                member.display(),
                archive_path.display()
            );
            continue;
        }

        trace!("Unpacking {}", member.display());
        entry
            .unpack_in(dest)
            .map_err(|e| SearchError::extraction(archive_path, e))?;
        written += 1;
    }

    if archive.into_inner().bytes == 0 {
        return Err(SearchError::extraction(archive_path, "archive is empty"));
    }
    Ok(written)
}

/// Extracts every entry of a tar or tar.gz archive into `dest`.
///
/// Returns the number of entries written. `dest` is created if needed.
pub fn unpack(archive_path: &Path, dest: &Path) -> SearchResult<usize> {
    fs::create_dir_all(dest)?;
    let kind = ArchiveKind::detect(archive_path)
        .map_err(|e| SearchError::extraction(archive_path, e))?;
    let file = File::open(archive_path).map_err(|e| SearchError::extraction(archive_path, e))?;

    debug!("Unpacking {} ({:?})", archive_path.display(), kind);
    match kind {
        ArchiveKind::PlainTar => unpack_entries(archive_path, BufReader::new(file), dest),
        ArchiveKind::TarGz => unpack_entries(
            archive_path,
            GzDecoder::new(BufReader::new(file)),
            dest,
        ),
    }
}

/// Moves everything under `from` into `to`, merging directories
fn merge_tree(from: &Path, to: &Path) -> SearchResult<()> {
    for path in walk_files(from) {
        let Ok(relative) = path.strip_prefix(from) else {
            continue;
        };
        let target = to.join(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::rename(&path, &target)?;
    }
    Ok(())
}

/// Unpacks into a private staging directory under `scratch`, then merges the
/// result into `dest`. A failing archive leaves nothing behind in `dest`.
pub fn unpack_staged(archive_path: &Path, dest: &Path, scratch: &Path) -> SearchResult<usize> {
    let staging = tempfile::Builder::new()
        .prefix(".staging-")
        .tempdir_in(scratch)?;
    let written = unpack(archive_path, staging.path())?;
    fs::create_dir_all(dest)?;
    merge_tree(staging.path(), dest).map_err(|e| SearchError::extraction(archive_path, e))?;
    Ok(written)
}

/// Every `.tar.gz` under `root`, in walk order
pub fn find_nested_archives(root: &Path) -> Vec<PathBuf> {
    walk_files(root)
        .into_iter()
        .filter(|p| is_nested_archive(p))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use tar::{Builder, EntryType, Header};
    use tempfile::tempdir;

    fn tar_bytes(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut builder = Builder::new(Vec::new());
        for (name, data) in files {
            let mut header = Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, *data).unwrap();
        }
        builder.into_inner().unwrap()
    }

    fn gzip(bytes: &[u8]) -> Vec<u8> {
        use std::io::Write;
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(bytes).unwrap();
        encoder.finish().unwrap()
    }

    /// A tar whose single member is named `name` verbatim, bypassing the
    /// builder's own path checks
    fn raw_tar_with_member(name: &str, data: &[u8]) -> Vec<u8> {
        let mut header = Header::new_old();
        {
            let bytes = header.as_old_mut();
            bytes.name[..name.len()].copy_from_slice(name.as_bytes());
        }
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_entry_type(EntryType::Regular);
        header.set_cksum();

        let mut out = header.as_bytes().to_vec();
        out.extend_from_slice(data);
        out.resize(512 + data.len().div_ceil(512) * 512, 0);
        out.extend_from_slice(&[0u8; 1024]);
        out
    }

    #[test]
    fn test_archive_kind_from_magic() {
        assert_eq!(
            ArchiveKind::from_magic_bytes(&[0x1f, 0x8b, 0x08, 0x00]),
            ArchiveKind::TarGz
        );
        assert_eq!(
            ArchiveKind::from_magic_bytes(b"app.log\0\0\0"),
            ArchiveKind::PlainTar
        );
        assert_eq!(ArchiveKind::from_magic_bytes(&[]), ArchiveKind::PlainTar);
    }

    #[test]
    fn test_is_top_level_archive() {
        let dir = tempdir().unwrap();
        for name in ["a.tar", "b.tar.gz", "c.tgz", "d.zip", "e.log"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        assert!(is_top_level_archive(&dir.path().join("a.tar")));
        assert!(is_top_level_archive(&dir.path().join("b.tar.gz")));
        assert!(is_top_level_archive(&dir.path().join("c.tgz")));
        assert!(!is_top_level_archive(&dir.path().join("d.zip")));
        assert!(!is_top_level_archive(&dir.path().join("e.log")));
        assert!(!is_top_level_archive(&dir.path().join("missing.tar")));
        assert!(!is_top_level_archive(dir.path()));
    }

    #[test]
    fn test_unpack_plain_tar() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("bundle.tar");
        fs::write(
            &archive,
            tar_bytes(&[("logs/app.log", b"hello\n"), ("top.txt", b"x")]),
        )
        .unwrap();

        let dest = dir.path().join("out");
        let written = unpack(&archive, &dest).unwrap();
        assert_eq!(written, 2);
        assert_eq!(fs::read(dest.join("logs/app.log")).unwrap(), b"hello\n");
        assert!(dest.join("top.txt").is_file());
    }

    #[test]
    fn test_unpack_gzip_detected_by_content() {
        let dir = tempdir().unwrap();
        // Gzip stream behind a plain .tar name
        let archive = dir.path().join("mislabelled.tar");
        fs::write(&archive, gzip(&tar_bytes(&[("app.log", b"ERROR\n")]))).unwrap();

        let dest = dir.path().join("out");
        unpack(&archive, &dest).unwrap();
        assert_eq!(fs::read_to_string(dest.join("app.log")).unwrap(), "ERROR\n");
    }

    #[test]
    fn test_unpack_rejects_parent_components() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("evil.tar");
        fs::write(&archive, raw_tar_with_member("../escape.log", b"pwned")).unwrap();

        let dest = dir.path().join("jail");
        let err = unpack(&archive, &dest).unwrap_err();
        assert!(matches!(err, SearchError::UnsafeArchivePath { .. }));
        assert!(!dir.path().join("escape.log").exists());
    }

    #[test]
    fn test_unpack_rejects_absolute_member() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("abs.tar");
        fs::write(&archive, raw_tar_with_member("/tmp/abs.log", b"x")).unwrap();

        let err = unpack(&archive, &dir.path().join("out")).unwrap_err();
        assert!(matches!(err, SearchError::UnsafeArchivePath { .. }));
    }

    #[test]
    fn test_unpack_empty_file_is_an_error() {
        let dir = tempdir().unwrap();
        let empty = dir.path().join("empty.tar");
        fs::write(&empty, b"").unwrap();
        let err = unpack(&empty, &dir.path().join("a")).unwrap_err();
        assert!(matches!(err, SearchError::Extraction { .. }));

        let empty_gz = dir.path().join("empty.tar.gz");
        fs::write(&empty_gz, gzip(b"")).unwrap();
        let err = unpack(&empty_gz, &dir.path().join("b")).unwrap_err();
        assert!(matches!(err, SearchError::Extraction { .. }));
    }

    #[test]
    fn test_unpack_tar_without_members() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("nothing.tar");
        fs::write(&archive, tar_bytes(&[])).unwrap();

        assert_eq!(unpack(&archive, &dir.path().join("out")).unwrap(), 0);
    }

    fn hard_link_header(target: &str) -> Header {
        let mut header = Header::new_gnu();
        header.set_entry_type(EntryType::Link);
        header.set_link_name(target).unwrap();
        header.set_size(0);
        header.set_mode(0o644);
        header
    }

    #[test]
    fn test_unpack_hard_link() {
        let dir = tempdir().unwrap();
        let mut builder = Builder::new(Vec::new());
        let data = b"ERROR linked\n";
        let mut header = Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, "logs/app.log", &data[..])
            .unwrap();
        builder
            .append_data(
                &mut hard_link_header("logs/app.log"),
                "logs/copy.log",
                std::io::empty(),
            )
            .unwrap();
        let archive = dir.path().join("links.tar");
        fs::write(&archive, builder.into_inner().unwrap()).unwrap();

        let dest = dir.path().join("out");
        assert_eq!(unpack(&archive, &dest).unwrap(), 2);
        assert_eq!(fs::read(dest.join("logs/copy.log")).unwrap(), data);
    }

    #[test]
    fn test_unpack_skips_dangling_hard_link() {
        let dir = tempdir().unwrap();
        let mut builder = Builder::new(Vec::new());
        builder
            .append_data(
                &mut hard_link_header("missing.log"),
                "dangling.log",
                std::io::empty(),
            )
            .unwrap();
        let archive = dir.path().join("dangling.tar");
        fs::write(&archive, builder.into_inner().unwrap()).unwrap();

        let dest = dir.path().join("out");
        assert_eq!(unpack(&archive, &dest).unwrap(), 0);
        assert!(!dest.join("dangling.log").exists());
    }

    #[test]
    fn test_unpack_corrupt_gzip() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("broken.tar.gz");
        let payload: String = (0..2000).map(|i| format!("{i} ERROR {}\n", i * 7919)).collect();
        let mut bytes = gzip(&tar_bytes(&[("app.log", payload.as_bytes())]));
        bytes.truncate(bytes.len() / 3);
        fs::write(&archive, bytes).unwrap();

        let err = unpack(&archive, &dir.path().join("out")).unwrap_err();
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_unpack_staged_leaves_nothing_on_failure() {
        let dir = tempdir().unwrap();
        let scratch = dir.path().join("scratch");
        let dest = dir.path().join("dest");
        fs::create_dir_all(&scratch).unwrap();
        fs::create_dir_all(&dest).unwrap();

        // First member is fine, second escapes
        let mut bytes = tar_bytes(&[("good.log", b"ok\n")]);
        bytes.truncate(bytes.len() - 1024);
        bytes.extend(raw_tar_with_member("../bad.log", b"x"));
        let archive = dir.path().join("mixed.tar.gz");
        fs::write(&archive, gzip(&bytes)).unwrap();

        assert!(unpack_staged(&archive, &dest, &scratch).is_err());
        assert_eq!(fs::read_dir(&dest).unwrap().count(), 0);
        assert_eq!(fs::read_dir(&scratch).unwrap().count(), 0);
    }

    #[test]
    fn test_unpack_staged_merges_into_shared_root() {
        let dir = tempdir().unwrap();
        let scratch = dir.path().join("scratch");
        let dest = dir.path().join("dest");
        fs::create_dir_all(&scratch).unwrap();

        let first = dir.path().join("first.tar.gz");
        let second = dir.path().join("second.tar.gz");
        fs::write(&first, gzip(&tar_bytes(&[("var/log/a.log", b"a\n")]))).unwrap();
        fs::write(&second, gzip(&tar_bytes(&[("var/log/b.log", b"b\n")]))).unwrap();

        unpack_staged(&first, &dest, &scratch).unwrap();
        unpack_staged(&second, &dest, &scratch).unwrap();

        assert!(dest.join("var/log/a.log").is_file());
        assert!(dest.join("var/log/b.log").is_file());
    }

    #[test]
    fn test_find_nested_archives() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("x/y")).unwrap();
        for name in ["x/y/b.tar.gz", "x/a.tar.gz", "x/plain.tar", "x/app.log.gz"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }

        let found = find_nested_archives(dir.path());
        assert_eq!(
            found,
            vec![dir.path().join("x/a.tar.gz"), dir.path().join("x/y/b.tar.gz")]
        );
    }
}

//! Zip-packaged program bundles and their manifest.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use tracing::debug;
use zip::ZipArchive;

use crate::error::ProgramError;

/// Location of the manifest inside a bundle.
pub const MANIFEST_PATH: &str = "META-INF/MANIFEST.MF";

/// Manifest attribute naming the program's entry point.
pub const MAIN_CLASS: &str = "Main-Class";

/// Manifest attribute holding the bundle-relative path of the flow specification.
pub const SPEC_FILE: &str = "Spec-File";

/// Main section of a bundle manifest.
///
/// Attribute names compare case-insensitively. A line starting with a single
/// space continues the previous value; the first blank line ends the main
/// section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    attributes: Vec<(String, String)>,
}

impl Manifest {
    pub fn parse(text: &str) -> Self {
        let mut attributes: Vec<(String, String)> = Vec::new();
        for line in text.lines() {
            if line.is_empty() {
                break;
            }
            if let Some(rest) = line.strip_prefix(' ') {
                if let Some((_, value)) = attributes.last_mut() {
                    value.push_str(rest);
                }
                continue;
            }
            if let Some((name, value)) = line.split_once(':') {
                let value = value.strip_prefix(' ').unwrap_or(value);
                attributes.push((name.trim().to_string(), value.to_string()));
            }
        }
        Self { attributes }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// A packaged program on the local filesystem.
#[derive(Debug, Clone)]
pub struct Bundle {
    path: PathBuf,
}

impl Bundle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn archive(&self) -> io::Result<ZipArchive<File>> {
        let file = File::open(&self.path)?;
        ZipArchive::new(file).map_err(io::Error::other)
    }

    /// Reads the manifest. A bundle that cannot be opened as an archive or
    /// carries no manifest is malformed.
    pub fn manifest(&self) -> Result<Manifest, ProgramError> {
        let malformed = |reason: String| ProgramError::MalformedBundle {
            path: self.path.clone(),
            reason,
        };
        let mut archive = self.archive().map_err(|e| malformed(e.to_string()))?;
        let mut entry = archive
            .by_name(MANIFEST_PATH)
            .map_err(|_| malformed(format!("failed to load manifest {MANIFEST_PATH}")))?;
        let mut text = String::new();
        entry
            .read_to_string(&mut text)
            .map_err(|e| malformed(format!("unreadable manifest: {e}")))?;
        Ok(Manifest::parse(&text))
    }

    /// Reads one packed entry as UTF-8 text without unpacking the bundle.
    pub fn read_entry(&self, name: &str) -> io::Result<String> {
        let mut archive = self.archive()?;
        let mut entry = archive.by_name(name).map_err(|e| {
            io::Error::new(io::ErrorKind::NotFound, format!("entry {name}: {e}"))
        })?;
        let mut text = String::new();
        entry.read_to_string(&mut text)?;
        Ok(text)
    }

    /// Extracts every entry under `dir`, creating it if needed. Entries whose
    /// path would land outside `dir` are rejected. Returns the number of
    /// files written.
    pub fn unpack(&self, dir: &Path) -> io::Result<usize> {
        let mut archive = self.archive()?;
        fs::create_dir_all(dir)?;
        let mut written = 0;
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i).map_err(io::Error::other)?;
            let relative = entry.enclosed_name().ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("entry {} escapes the target directory", entry.name()),
                )
            })?;
            let target = dir.join(relative);
            if entry.is_dir() {
                fs::create_dir_all(&target)?;
                continue;
            }
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut out = File::create(&target)?;
            io::copy(&mut entry, &mut out)?;
            written += 1;
        }
        debug!(bundle = %self.path.display(), dir = %dir.display(), files = written, "bundle unpacked");
        Ok(written)
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::write_bundle;
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn manifest_parse_handles_continuations_and_case() {
        let text = "Manifest-Version: 1.0\r\nmain-class: com.acme.flow.Packet\r\n Count\r\nSpec-File: META-INF/spec.json\r\n\r\nName: other\r\nMain-Class: ignored\r\n";
        let manifest = Manifest::parse(text);
        assert_eq!(manifest.get(MAIN_CLASS), Some("com.acme.flow.PacketCount"));
        assert_eq!(manifest.get("SPEC-FILE"), Some("META-INF/spec.json"));
        assert_eq!(manifest.get("Name"), None);
    }

    #[test]
    fn manifest_missing_from_archive_is_malformed() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("app.jar");
        write_bundle(&path, &[("spec.json", "{}")]);
        let err = Bundle::new(&path).manifest().unwrap_err();
        assert!(matches!(err, ProgramError::MalformedBundle { .. }));
    }

    #[test]
    fn non_archive_is_malformed() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("app.jar");
        fs::write(&path, "plain text").unwrap();
        let err = Bundle::new(&path).manifest().unwrap_err();
        assert!(matches!(err, ProgramError::MalformedBundle { .. }));
    }

    #[test]
    fn read_entry_and_unpack() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("app.jar");
        write_bundle(
            &path,
            &[
                ("META-INF/MANIFEST.MF", "Main-Class: a.B\n"),
                ("a/B.class", "bytes"),
            ],
        );
        let bundle = Bundle::new(&path);
        assert_eq!(bundle.read_entry("a/B.class").unwrap(), "bytes");
        assert_eq!(
            bundle.read_entry("missing").unwrap_err().kind(),
            io::ErrorKind::NotFound
        );

        let out = tmp.path().join("expanded");
        assert_eq!(bundle.unpack(&out).unwrap(), 2);
        assert_eq!(fs::read_to_string(out.join("a/B.class")).unwrap(), "bytes");
    }
}

//! Isolated code-loading contexts.
//!
//! A [`CodeContext`] is the view one program has of loadable code: the files
//! of its own unpacked bundle plus the host's API resources. API resources
//! always win, so a program cannot shadow the host API with its own copy,
//! and two programs never see each other's files.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing::debug;

use crate::error::ProgramError;

/// File extension of compiled program modules.
pub const MODULE_EXTENSION: &str = "class";

/// Resource prefixes exported by the host to every program.
const API_PACKAGES: &[&str] = &[
    "streamforge/api/",
    "streamforge/sql/api/",
];

/// Process-wide, read-only set of host API resources.
#[derive(Debug)]
pub struct ApiResources {
    prefixes: Vec<String>,
}

impl ApiResources {
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }

    /// The shared instance built from the host API packages.
    pub fn global() -> &'static ApiResources {
        static API: OnceLock<ApiResources> = OnceLock::new();
        API.get_or_init(|| ApiResources::new(API_PACKAGES.iter().copied()))
    }

    pub fn contains(&self, resource: &str) -> bool {
        self.prefixes.iter().any(|prefix| resource.starts_with(prefix))
    }
}

/// Where a symbol was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Served by the host API; the resource name is returned as-is.
    Api(String),
    /// A file inside the program's own tree.
    Program(PathBuf),
}

#[derive(Debug)]
pub struct CodeContext {
    root: PathBuf,
    entries: BTreeSet<String>,
    api: &'static ApiResources,
}

impl CodeContext {
    /// Indexes every file under `root`. Fails if the tree cannot be read.
    pub fn new(root: &Path, api: &'static ApiResources) -> Result<Self, ProgramError> {
        let mut entries = BTreeSet::new();
        collect(root, root, &mut entries).map_err(|e| ProgramError::CodeLoad {
            dir: root.to_path_buf(),
            reason: e.to_string(),
        })?;
        debug!(root = %root.display(), entries = entries.len(), "code context built");
        Ok(Self {
            root: root.to_path_buf(),
            entries,
            api,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether the program tree holds `resource` (a `/`-separated relative path).
    pub fn contains(&self, resource: &str) -> bool {
        self.entries.contains(resource)
    }

    /// Resolves a dotted symbol such as `com.acme.flow.Counter`.
    pub fn resolve(&self, symbol: &str) -> Result<Resolution, ProgramError> {
        let resource = resource_name(symbol);
        if self.api.contains(&resource) {
            return Ok(Resolution::Api(resource));
        }
        if self.entries.contains(&resource) {
            return Ok(Resolution::Program(self.root.join(&resource)));
        }
        Err(ProgramError::SymbolNotFound {
            symbol: symbol.to_string(),
        })
    }
}

fn resource_name(symbol: &str) -> String {
    format!("{}.{MODULE_EXTENSION}", symbol.replace('.', "/"))
}

fn collect(root: &Path, dir: &Path, out: &mut BTreeSet<String>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            collect(root, &path, out)?;
        } else if let Ok(relative) = path.strip_prefix(root) {
            let parts: Vec<_> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            out.insert(parts.join("/"));
        }
    }
    Ok(())
}

use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};
#[cfg(test)]
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use tracing::{debug, warn};

use super::bundle::{Bundle, MAIN_CLASS, Manifest, SPEC_FILE};
use super::code_context::{ApiResources, CodeContext, Resolution};
use crate::error::ProgramError;
use crate::spec::{FlowSpecification, SpecificationCodec};

/// Kind of program a bundle holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramType {
    Flow,
}

impl fmt::Display for ProgramType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgramType::Flow => write!(f, "FLOW"),
        }
    }
}

/// A program resolved from a bundle.
///
/// The main class name is read when the handle is created. The flow
/// specification and the code context are resolved on first access and then
/// cached for the lifetime of the handle. Each lazy field resolves at most
/// once even when many threads ask for it at the same time; threads that
/// lose the race block until the winner finishes and then share its result.
/// A failed resolution is cached too: every later call returns the same
/// error. Build a new handle to try again.
///
/// The work directory is written to on first lazy access and never cleaned
/// up by the handle; it belongs to the caller.
pub struct Program {
    main_class_name: String,
    program_type: ProgramType,
    bundle: Bundle,
    work_dir: Option<PathBuf>,
    spec_entry: String,
    unpacked: OnceLock<Result<(), ProgramError>>,
    specification: OnceLock<Result<Arc<FlowSpecification>, ProgramError>>,
    code_context: OnceLock<Result<Arc<CodeContext>, ProgramError>>,
    #[cfg(test)]
    unpack_runs: AtomicUsize,
}

impl Program {
    /// Opens the bundle at `artifact`.
    ///
    /// With a `work_dir`, the specification and code context are loaded
    /// lazily from the unpacked bundle. Without one, the specification is
    /// parsed right away from the packed entry and the code context can only
    /// come from [`Program::with_code_context`].
    pub fn open(
        artifact: impl Into<PathBuf>,
        work_dir: Option<PathBuf>,
    ) -> Result<Self, ProgramError> {
        let bundle = Bundle::new(artifact);
        let manifest = bundle.manifest()?;
        let main_class_name = attribute(&bundle, &manifest, MAIN_CLASS)?;
        let spec_entry = attribute(&bundle, &manifest, SPEC_FILE)?;
        check_spec_entry(&spec_entry)?;

        let program = Self {
            main_class_name,
            program_type: ProgramType::Flow,
            bundle,
            work_dir,
            spec_entry,
            unpacked: OnceLock::new(),
            specification: OnceLock::new(),
            code_context: OnceLock::new(),
            #[cfg(test)]
            unpack_runs: AtomicUsize::new(0),
        };

        if program.work_dir.is_none() {
            let spec = program.load_packed_specification()?;
            let _ = program.specification.set(Ok(Arc::new(spec)));
        }

        debug!(
            bundle = %program.bundle.path().display(),
            main_class = %program.main_class_name,
            lazy = program.work_dir.is_some(),
            "program opened"
        );
        Ok(program)
    }

    /// Opens the bundle and adopts `context` as its code context. The
    /// specification is read eagerly from the packed bundle.
    pub fn with_code_context(
        artifact: impl Into<PathBuf>,
        context: Arc<CodeContext>,
    ) -> Result<Self, ProgramError> {
        let program = Self::open(artifact, None)?;
        let _ = program.code_context.set(Ok(context));
        Ok(program)
    }

    pub fn main_class_name(&self) -> &str {
        &self.main_class_name
    }

    pub fn id(&self) -> &str {
        &self.main_class_name
    }

    pub fn name(&self) -> &str {
        self.id()
    }

    pub fn program_type(&self) -> ProgramType {
        self.program_type
    }

    pub fn artifact(&self) -> &Path {
        self.bundle.path()
    }

    /// Bundle-relative path of the specification entry.
    pub fn spec_entry(&self) -> &str {
        &self.spec_entry
    }

    pub fn specification(&self) -> Result<Arc<FlowSpecification>, ProgramError> {
        self.specification
            .get_or_init(|| self.load_unpacked_specification().map(Arc::new))
            .clone()
    }

    pub fn code_context(&self) -> Result<Arc<CodeContext>, ProgramError> {
        self.code_context
            .get_or_init(|| {
                let dir = self.ensure_unpacked()?;
                CodeContext::new(dir, ApiResources::global()).map(Arc::new)
            })
            .clone()
    }

    /// Resolves the main class through the code context.
    pub fn main_module(&self) -> Result<Resolution, ProgramError> {
        self.code_context()?.resolve(&self.main_class_name)
    }

    fn ensure_unpacked(&self) -> Result<&Path, ProgramError> {
        let dir = self.work_dir.as_deref().ok_or_else(|| {
            ProgramError::Configuration("directory for bundle expansion is not defined".into())
        })?;
        self.unpacked
            .get_or_init(|| {
                #[cfg(test)]
                self.unpack_runs.fetch_add(1, Ordering::SeqCst);
                self.bundle
                    .unpack(dir)
                    .map(|_| ())
                    .map_err(|e| ProgramError::Unpack {
                        dir: dir.to_path_buf(),
                        reason: e.to_string(),
                    })
            })
            .clone()?;
        Ok(dir)
    }

    fn load_packed_specification(&self) -> Result<FlowSpecification, ProgramError> {
        let text = self
            .bundle
            .read_entry(&self.spec_entry)
            .map_err(|e| self.spec_error(e.to_string()))?;
        FlowSpecification::from_json(&text).map_err(|e| self.spec_error(e.to_string()))
    }

    fn load_unpacked_specification(&self) -> Result<FlowSpecification, ProgramError> {
        let dir = self.ensure_unpacked()?;
        let path = dir.join(&self.spec_entry);
        let text = fs::read_to_string(&path).map_err(|e| self.spec_error(e.to_string()))?;
        let spec = FlowSpecification::from_json(&text).map_err(|e| {
            warn!(entry = %self.spec_entry, error = %e, "invalid flow specification");
            self.spec_error(e.to_string())
        })?;
        debug!(flow = %spec.name, flowlets = spec.flowlets.len(), "specification loaded");
        Ok(spec)
    }

    fn spec_error(&self, reason: String) -> ProgramError {
        ProgramError::SpecificationLoad {
            entry: self.spec_entry.clone(),
            reason,
        }
    }
}

impl fmt::Debug for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Program")
            .field("main_class_name", &self.main_class_name)
            .field("artifact", &self.bundle.path())
            .field("work_dir", &self.work_dir)
            .field("spec_entry", &self.spec_entry)
            .finish_non_exhaustive()
    }
}

fn attribute(bundle: &Bundle, manifest: &Manifest, name: &str) -> Result<String, ProgramError> {
    manifest
        .get(name)
        .map(str::to_string)
        .ok_or_else(|| ProgramError::MissingAttribute {
            path: bundle.path().to_path_buf(),
            attribute: name.to_string(),
        })
}

/// The specification entry must stay inside the unpacked bundle.
fn check_spec_entry(entry: &str) -> Result<(), ProgramError> {
    let escapes = Path::new(entry)
        .components()
        .any(|c| matches!(c, Component::RootDir | Component::ParentDir | Component::Prefix(_)));
    if escapes || entry.is_empty() {
        return Err(ProgramError::SpecificationLoad {
            entry: entry.to_string(),
            reason: "entry must be a relative path inside the bundle".into(),
        });
    }
    Ok(())
}

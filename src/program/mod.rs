//! Program bundle loading: manifest, lazily unpacked code and specification.

mod bundle;
mod code_context;
#[allow(clippy::module_inception)]
mod program;

pub use bundle::{Bundle, MAIN_CLASS, MANIFEST_PATH, Manifest, SPEC_FILE};
pub use code_context::{ApiResources, CodeContext, MODULE_EXTENSION, Resolution};
pub use program::{Program, ProgramType};

//! Bootstrap and provisioning layer of a stream-processing platform.
//!
//! * [`program`] turns a packaged bundle into a [`Program`](program::Program)
//!   whose flow specification and code context resolve lazily, once, under
//!   concurrent access.
//! * [`engine`] provisions the native continuous-query engine through a
//!   fail-fast pipeline of external build steps.
//! * [`spec`] defines the flow and flowlet specifications and their textual
//!   codec.
//! * [`flow_ops`] is the operator-facing `stop` command and its collaborator.

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod flow_ops;
pub mod program;
pub mod spec;
pub mod ui;

pub use error::{
    DeserializationError, FlowOpsError, ProgramError, ProvisionError, StreamforgeError,
};

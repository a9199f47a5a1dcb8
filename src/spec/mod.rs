//! Declarative flow and flowlet specifications and their textual codec.

mod codec;
mod flow;
mod flowlet;

pub use codec::SpecificationCodec;
pub use flow::{FlowSpecification, FlowletConnection, FlowletDefinition};
pub use flowlet::{FailurePolicy, FlowletSpecification, ResourceSpecification};

#[cfg(test)]
pub(crate) use flow::fixtures;

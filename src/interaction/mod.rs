//! Interaction handling
//!
//! Wire shapes, per-dispatch context and the router that connects gateway
//! events to registered capabilities.

pub mod context;
pub mod error;
pub mod router;
pub mod types;

pub use context::{ContextProvider, HasMeta, InteractionContext};
pub use error::ExecutionError;
pub use router::{DispatchOutcome, InteractionRouter};
pub use types::{
    CommandInteraction, CommandOption, ComponentInteraction, Interaction, InteractionMeta,
    RawInteraction,
};

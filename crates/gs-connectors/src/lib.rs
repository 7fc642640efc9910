//! # gs-connectors
//!
//! Concrete collaborators for the goal score batch: a member directory read
//! from a JSON file and a Goal Engine that shells out to a scoring program.

pub mod engine;
pub mod error;
pub mod members;

pub use engine::{CommandGoalEngine, EngineConfig};
pub use error::ConnectorError;
pub use members::{JsonMemberStore, MembersConfig};

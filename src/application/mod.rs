//! Composition root: builds the shared context once and runs the selected
//! front end on it.

mod application;
mod context;
pub mod data;
mod display;
mod front_end;
mod runtime_config;

pub use application::{Application, ApplicationError};
pub use context::AppContext;
pub use runtime_config::RuntimeConfig;

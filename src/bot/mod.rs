//! Chat command handling on top of the rate limiter.

mod catalog;
mod command;
mod console;
mod handler;
mod store;

pub use catalog::{Catalog, FitnessLevel, Goal, Plan, Sport};
pub use command::Command;
pub use console::ConsoleServer;
pub use handler::{Dispatcher, HELP, RATE_LIMITED, WELCOME};
pub use store::{MemoryStore, ProfileStore};

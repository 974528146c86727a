pub mod orchestrator;

#[cfg(test)]
mod tests;

pub use orchestrator::{AttemptHandle, Dispatcher, OpenCallbacks, Opening};

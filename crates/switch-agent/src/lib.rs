//! Switch agent - command line front end for the online switch link

pub mod agent;
pub mod cli;

pub use agent::{Agent, send_once, summarize};
pub use cli::{Action, Args};

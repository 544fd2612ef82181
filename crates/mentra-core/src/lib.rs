pub mod action;
pub mod alias;
pub mod builtin;
pub mod calling;
pub mod carrier;
pub mod command;
pub mod config;
pub mod contact;
pub mod context;
pub mod device;
pub mod error;
pub mod executor;
pub mod messaging;
pub mod phone;
pub mod result;
pub mod shell;
pub mod ussd;

#[cfg(test)]
mod testing;

// Re-export common types
pub use error::{Result, ShellError};
pub use result::{ResultStatus, ShellOutput, ShellResult};
pub use shell::{Shell, ShellReply, ShellServices};

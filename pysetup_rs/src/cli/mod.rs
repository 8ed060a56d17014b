//! `pysetup` command-line interface.
//!
//! - `command`: clap definitions for every subcommand
//! - `dispatch`: one handler per subcommand
//! - `entrypoint`: logging setup and exit codes

pub mod command;
pub mod dispatch;
pub mod entrypoint;

pub use command::{Cli, Command, GlobalOptions};
pub use entrypoint::run;

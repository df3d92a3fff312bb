// Commands of the control channel and their handlers
pub mod bye;
pub mod cd;
pub mod command;
pub mod get;
pub mod handlers;
pub mod ls;
pub mod reply;


pub use command::{Command, CommandError};
pub use handlers::{dispatch, Flow};

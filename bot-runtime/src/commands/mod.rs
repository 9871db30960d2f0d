//! Built-in commands.

mod prefix;

pub use prefix::PrefixCommand;

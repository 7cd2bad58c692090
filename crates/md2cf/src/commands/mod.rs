//! CLI command implementations.

pub(crate) mod convert;
pub(crate) mod log;

pub(crate) use convert::ConvertArgs;
pub(crate) use log::LogArgs;

//! Editors for the configuration files consumed by MPAS and WPS.
//!
//! Both editors change only what they are asked to change: every other byte
//! of the file (comments, ordering, indentation) is written back as read.
//!
//! - [`Namelist`]: Fortran `&group ... /` namelists (`namelist.wps`,
//!   `namelist.init_atmosphere`, `namelist.atmosphere`)
//! - [`Streams`]: MPAS XML streams files (`streams.init_atmosphere`,
//!   `streams.atmosphere`)

pub mod error;
pub mod namelist;
pub mod streams;

pub use error::{ConfigError, ConfigResult};
pub use namelist::{Namelist, NamelistValue};
pub use streams::Streams;

//! Common types shared by the downloader and the model runner.

pub mod bbox;
pub mod time;

pub use bbox::BoundingBox;
pub use time::{
    namelist_date, resolve_cycle, resolve_init_date, run_duration, InitDate, ModelCycle,
    NAMELIST_DATE_FORMAT,
};

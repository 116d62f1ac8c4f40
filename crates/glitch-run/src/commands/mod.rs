pub mod classify;
pub mod cycles;
pub mod dry_run;
pub mod records;
pub mod summary;

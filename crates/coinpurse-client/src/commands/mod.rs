pub mod import;
pub mod records;

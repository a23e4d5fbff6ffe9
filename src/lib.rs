pub mod aggregate;
pub mod coords;
pub mod geo;
pub mod output;
pub mod records;
pub mod summary;

// Import from back-office dumps and export of schedule files.

pub mod export;
pub mod import;

pub use export::*;
pub use import::*;

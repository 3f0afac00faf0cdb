pub mod document;
pub mod workbook;

pub use document::*;
pub use workbook::*;

//! Report output: the PDF writer and the document assembler.

pub mod generator;
pub mod pdf;

pub use generator::{write_json_summary, PdfReportGenerator};

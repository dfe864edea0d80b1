mod document_engine;
mod yrs_document;

pub use document_engine::*;
pub use yrs_document::*;

//! OCR layer: hosted document analysis that turns PDF/image bytes into text.

pub mod http;

pub use http::{DocumentIntelligenceClient, OcrError, TextExtractor};

pub mod api;
pub mod ast;
pub mod error;
pub mod infer;
pub mod lexer;
pub mod loader;
pub mod parser;
pub mod resolver;
pub mod utils;
mod serialization;

pub use api::{analyze, analyze_file, evaluate, AnalysisResult};
pub use ast::LoonValue;
pub use error::LoonError;
pub use serialization::Value;

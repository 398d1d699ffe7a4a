// Pipeline processing: field parsing, canonicalization, composites and diagnostics

pub mod diagnostics;
pub mod features;
pub mod normalize;
pub mod parser;

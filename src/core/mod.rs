pub mod ast;
pub mod paths;
pub mod types;

pub use ast::{CallSite, FunctionSpan, ImportSpec, SourceUnit};
pub use types::{DebtMarker, DebtType, FixPotential, Language, MarkerId, SourceMap};

// crates/model-gate-core/src/source/mod.rs
// ============================================================================
// Module: Model Gate Interpreted Source
// Description: Lexer, syntax tree, entry contract, and policy scanner.
// Purpose: Analyse interpreted model source without evaluating it.
// Dependencies: crate::core, crate::validate
// ============================================================================

//! ## Overview
//! Source text flows through [`lexer::tokenize`] and [`parser::parse_module`]
//! into the closed tree in [`syntax`]. The entry-contract check and the
//! policy scanner both work on that tree by exhaustive matching.

pub mod contract;
pub mod lexer;
pub mod parser;
pub mod scanner;
pub mod syntax;

pub use contract::ContractOutcome;
pub use contract::check_entry_contract;
pub use contract::check_module_contract;
pub use parser::MAX_NESTING_DEPTH;
pub use parser::parse_module;
pub use scanner::SourceScan;
pub use scanner::SourceViolation;
pub use scanner::ViolationCategory;
pub use scanner::scan_module;
pub use scanner::scan_source;
pub use syntax::Module;
pub use syntax::SourceSyntaxError;

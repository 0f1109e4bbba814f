// crates/model-gate-core/src/bytecode/mod.rs
// ============================================================================
// Module: Model Gate Compiled Bytecode
// Description: Class-file parsing and constant-pool policy scanning.
// Purpose: Analyse compiled model classes without loading them.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! [`class_file`] turns class bytes into a [`ClassDescriptor`] plus the
//! resolved references of its constant pool; [`scanner`] applies the bytecode
//! policy and the exact-match interface and method checks.

pub mod class_file;
pub mod scanner;

pub use class_file::ClassDescriptor;
pub use class_file::ClassParseError;
pub use class_file::MethodInfo;
pub use class_file::ParsedClass;
pub use class_file::PoolReference;
pub use class_file::class_info;
pub use class_file::parse_class;
pub use scanner::BytecodeScan;
pub use scanner::ClassContractError;
pub use scanner::check_has_method;
pub use scanner::check_implements_interface;
pub use scanner::scan_class;
pub use scanner::scan_parsed;

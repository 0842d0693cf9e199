// vargate-core/src/domain/guard/mod.rs

pub mod keywords;
pub mod statement;

pub use statement::{
    GuardRejection, Placeholder, PlaceholderKind, SqlFlavor, StatementGuard, ValidatedStatement,
};

mod parser;
mod source;

pub use parser::{ParseError, Parser};
pub use source::Source;

use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// One row of a table, built up column by column. Absorbers ignore unknown
/// columns; fields the row never mentions keep their type defaults.
pub trait Record: Default {
    fn absorb(&mut self, field: &str, value: &str) -> Result<(), FieldError>;
}

/// A typed setter rejected a value; the whole record is dropped.
#[derive(Error, Debug)]
#[error("bad value {value:?} for {field}: {reason}")]
pub struct FieldError {
    pub field: &'static str,
    pub value: String,
    pub reason: &'static str,
}

impl FieldError {
    pub fn new(field: &'static str, value: &str, reason: &'static str) -> Self {
        Self {
            field,
            value: value.to_string(),
            reason,
        }
    }
}

/// Drives one parsed row into a record. Empty values are skipped so that
/// missing or blank columns leave fields at their defaults; values beyond
/// the header width were already discarded by the parser.
pub fn read_record<T: Record>(keys: &[String], values: &[String]) -> Result<T, FieldError> {
    let mut record = T::default();
    for (key, value) in keys.iter().zip(values.iter()) {
        if value.is_empty() {
            continue;
        }
        record.absorb(key, value)?;
    }
    Ok(record)
}

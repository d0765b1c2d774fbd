use std::io::BufRead;

use thiserror::Error;
use tracing::warn;

/// Longest accepted logical line. A line without a terminator inside this
/// window fails the whole table.
pub const MAX_LINE_LEN: usize = 64 * 1024;

#[derive(Error, Debug)]
#[error("parse error in {file} at line {line}: {message}")]
pub struct ParseError {
    pub file: String,
    pub line: usize,
    pub message: String,
}

/// Reads one named comma-separated table: the first non-empty line is the
/// header, every following line a record aligned with it.
///
/// Fields may be double-quote wrapped; inside quotes a doubled quote is a
/// literal quote and commas are literal. A stray quote in an unquoted field
/// is tolerated (and logged) as a literal. Leading spaces of unquoted
/// fields are dropped; every other space is kept. Raw TAB or CR bytes make
/// the line invalid: it is skipped with a diagnostic and parsing continues.
pub struct Parser<'a> {
    file: &'a str,
}

impl<'a> Parser<'a> {
    pub fn new(file: &'a str) -> Self {
        Self { file }
    }

    /// Parses the table, invoking `handler` with (header keys, values) per
    /// record. Records shorter than the header are padded with empty
    /// strings. An unparsable header or an over-long line fails the table;
    /// any other bad line is skipped.
    pub fn parse<R: BufRead>(
        &self,
        mut reader: R,
        mut handler: impl FnMut(&[String], &[String]),
    ) -> Result<(), ParseError> {
        let mut line_number = 0usize;
        let mut keys: Vec<String> = Vec::new();
        let mut buf = String::new();
        loop {
            buf.clear();
            let read = reader
                .read_line(&mut buf)
                .map_err(|err| self.error(line_number + 1, err.to_string()))?;
            if read == 0 {
                return Ok(());
            }
            line_number += 1;
            if read > MAX_LINE_LEN {
                return Err(self.error(
                    line_number,
                    format!("line longer than {MAX_LINE_LEN} bytes"),
                ));
            }

            let line = trim_terminator(&buf);
            if line.is_empty() {
                continue;
            }

            match self.split_fields(line_number, line) {
                Ok(values) if keys.is_empty() => keys = values,
                Ok(mut values) => {
                    if values.len() < keys.len() {
                        values.resize(keys.len(), String::new());
                    }
                    handler(&keys, &values);
                }
                Err(message) if keys.is_empty() => return Err(self.error(line_number, message)),
                Err(message) => {
                    warn!(
                        file = self.file,
                        line = line_number,
                        %message,
                        "skipping bad line"
                    );
                }
            }
        }
    }

    fn error(&self, line: usize, message: String) -> ParseError {
        ParseError {
            file: self.file.to_string(),
            line,
            message,
        }
    }

    fn split_fields(&self, line_number: usize, line: &str) -> Result<Vec<String>, String> {
        let mut fields = Vec::with_capacity(10);
        let mut field = String::new();
        let mut started_with_quote = false;
        let mut in_quotes = false;

        for (column, ch) in line.chars().enumerate() {
            match ch {
                '\t' | '\r' | '\n' => {
                    return Err(format!("illegal character {ch:?} at column {column}"));
                }
                '"' => {
                    if !started_with_quote && field.is_empty() {
                        started_with_quote = true;
                        in_quotes = true;
                    } else if !started_with_quote {
                        // A quote in the middle of an unquoted field:
                        // tolerated as a literal.
                        warn!(
                            file = self.file,
                            line = line_number,
                            column,
                            "unexpected quote kept literally"
                        );
                        field.push('"');
                    } else if in_quotes {
                        // Closing quote, or the first half of a doubled one.
                        in_quotes = false;
                    } else {
                        // Second half of a doubled quote.
                        field.push('"');
                        in_quotes = true;
                    }
                }
                ',' => {
                    if started_with_quote && in_quotes {
                        field.push(',');
                    } else {
                        fields.push(std::mem::take(&mut field));
                        started_with_quote = false;
                        in_quotes = false;
                    }
                }
                ' ' => {
                    if in_quotes || !field.is_empty() {
                        field.push(' ');
                    }
                }
                other => field.push(other),
            }
        }
        fields.push(field);
        Ok(fields)
    }
}

fn trim_terminator(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

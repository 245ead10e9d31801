//! Diagnostic label encoding
//!
//! Metadata stores each record's codes as a dict literal mapping code to
//! likelihood, e.g. `{'NORM': 100.0, 'SR': 0.0}`. Only the keys matter here.
//! A [`Vocabulary`] is fitted once over the loaded corpus and then maps code
//! sets to fixed-width multi-hot vectors and back.

use crate::types::CodeSet;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::iter::Peekable;
use std::str::Chars;
use thiserror::Error;

/// Probability at or above which a decoded position counts as present
pub const DECODE_THRESHOLD: f32 = 0.5;

#[derive(Debug, Error, PartialEq)]
#[error("Invalid code mapping at offset {offset}: {reason}")]
pub struct LabelParseError {
    pub offset: usize,
    pub reason: String,
}

/// Parse the keys of a dict-literal code mapping
pub fn parse_scp_codes(input: &str) -> Result<CodeSet, LabelParseError> {
    CodeMapParser::new(input).parse()
}

/// Like [`parse_scp_codes`], but a missing or malformed field yields an empty set
pub fn codes_or_empty(input: Option<&str>) -> CodeSet {
    match input {
        Some(raw) => parse_scp_codes(raw).unwrap_or_else(|e| {
            tracing::debug!(error = %e, "Unparseable code mapping, using empty label set");
            CodeSet::new()
        }),
        None => CodeSet::new(),
    }
}

struct CodeMapParser<'a> {
    chars: Peekable<Chars<'a>>,
    offset: usize,
}

impl<'a> CodeMapParser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            offset: 0,
        }
    }

    fn error(&self, reason: impl Into<String>) -> LabelParseError {
        LabelParseError {
            offset: self.offset,
            reason: reason.into(),
        }
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next();
        if c.is_some() {
            self.offset += 1;
        }
        c
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.chars.peek(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), LabelParseError> {
        match self.bump() {
            Some(c) if c == expected => Ok(()),
            Some(c) => Err(self.error(format!("expected '{}', found '{}'", expected, c))),
            None => Err(self.error(format!("expected '{}', found end of input", expected))),
        }
    }

    fn parse(mut self) -> Result<CodeSet, LabelParseError> {
        let mut codes = CodeSet::new();
        self.skip_whitespace();
        self.expect('{')?;

        loop {
            self.skip_whitespace();
            match self.chars.peek().copied() {
                Some('}') => {
                    self.bump();
                    break;
                }
                Some('\'') | Some('"') => {}
                Some(c) => {
                    return Err(self.error(format!("expected quoted key, found '{}'", c)));
                }
                None => return Err(self.error("unterminated mapping")),
            }

            let key = self.quoted_string()?;
            self.skip_whitespace();
            self.expect(':')?;
            self.skip_value()?;
            codes.insert(key);

            self.skip_whitespace();
            match self.bump() {
                Some(',') => continue,
                Some('}') => break,
                Some(c) => return Err(self.error(format!("expected ',' or '}}', found '{}'", c))),
                None => return Err(self.error("unterminated mapping")),
            }
        }

        self.skip_whitespace();
        if self.chars.peek().is_some() {
            return Err(self.error("trailing characters after mapping"));
        }
        Ok(codes)
    }

    fn quoted_string(&mut self) -> Result<String, LabelParseError> {
        let quote = self.bump().ok_or_else(|| self.error("expected quote"))?;
        let mut value = String::new();
        loop {
            match self.bump() {
                Some('\\') => match self.bump() {
                    Some(escaped) => value.push(escaped),
                    None => return Err(self.error("unterminated escape")),
                },
                Some(c) if c == quote => break,
                Some(c) => value.push(c),
                None => return Err(self.error("unterminated string")),
            }
        }
        if value.trim().is_empty() {
            return Err(self.error("empty code"));
        }
        Ok(value)
    }

    /// Skip a scalar value up to the next top-level ',' or '}'
    fn skip_value(&mut self) -> Result<(), LabelParseError> {
        self.skip_whitespace();
        let mut consumed = 0usize;
        let mut depth = 0usize;
        while let Some(&c) = self.chars.peek() {
            match c {
                '\'' | '"' => {
                    self.quoted_string()?;
                    consumed += 1;
                    continue;
                }
                '[' | '(' | '{' => depth += 1,
                ']' | ')' => depth = depth.saturating_sub(1),
                '}' if depth > 0 => depth -= 1,
                ',' | '}' if depth == 0 => break,
                _ => {}
            }
            self.bump();
            consumed += 1;
        }
        if consumed == 0 {
            return Err(self.error("missing value"));
        }
        Ok(())
    }
}

/// Sorted, immutable set of known codes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vocabulary {
    codes: Vec<String>,
}

impl Vocabulary {
    /// Sorted union of all code sets
    pub fn fit<'a, I>(sets: I) -> Self
    where
        I: IntoIterator<Item = &'a CodeSet>,
    {
        let mut union = CodeSet::new();
        for set in sets {
            union.extend(set.iter().cloned());
        }
        Self {
            codes: union.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn codes(&self) -> &[String] {
        &self.codes
    }

    pub fn index_of(&self, code: &str) -> Option<usize> {
        self.codes.binary_search_by(|c| c.as_str().cmp(code)).ok()
    }

    pub fn code(&self, index: usize) -> Option<&str> {
        self.codes.get(index).map(String::as_str)
    }

    /// Multi-hot vector; codes outside the vocabulary are dropped
    pub fn encode(&self, set: &CodeSet) -> Vec<f32> {
        let mut encoded = vec![0.0; self.codes.len()];
        for code in set {
            if let Some(index) = self.index_of(code) {
                encoded[index] = 1.0;
            }
        }
        encoded
    }

    /// Codes whose position is at or above [`DECODE_THRESHOLD`]
    pub fn decode(&self, values: &[f32]) -> CodeSet {
        self.codes
            .iter()
            .zip(values)
            .filter(|(_, &v)| v >= DECODE_THRESHOLD)
            .map(|(code, _)| code.clone())
            .collect()
    }

    /// (records × classes) label matrix
    pub fn encode_all<'a, I>(&self, sets: I) -> Array2<f32>
    where
        I: IntoIterator<Item = &'a CodeSet>,
    {
        let rows: Vec<Vec<f32>> = sets.into_iter().map(|s| self.encode(s)).collect();
        let mut matrix = Array2::zeros((rows.len(), self.codes.len()));
        for (i, row) in rows.iter().enumerate() {
            for (j, &v) in row.iter().enumerate() {
                matrix[[i, j]] = v;
            }
        }
        matrix
    }
}

// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Roster-file reader.
//!
//! A roster is a delimited text file whose first line is a header and whose
//! remaining lines each carry one identity per row at a fixed column index.
//! The reader returns the identity names in file order. A data row with too
//! few columns fails the whole read rather than being skipped silently, so
//! a mis-specified delimiter cannot quietly produce a half-empty batch.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

/// Default field separator for roster files.
pub const DEFAULT_DELIMITER: char = ';';

/// Default column index holding the identity name (zero-based).
pub const DEFAULT_COLUMN: usize = 3;

/// Errors that can occur while reading a roster file.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
	#[error("failed to read roster file: {0}")]
	Io(#[from] std::io::Error),

	#[error("malformed row at line {line}: {columns} column(s), need at least {needed}")]
	MalformedRow {
		line: usize,
		columns: usize,
		needed: usize,
	},
}

/// A delimited roster file on disk.
#[derive(Debug, Clone)]
pub struct RosterFile {
	path: PathBuf,
	delimiter: char,
	column: usize,
}

impl RosterFile {
	/// Describe a roster file with the default delimiter and column.
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self {
			path: path.into(),
			delimiter: DEFAULT_DELIMITER,
			column: DEFAULT_COLUMN,
		}
	}

	/// Override the field separator.
	pub fn with_delimiter(mut self, delimiter: char) -> Self {
		self.delimiter = delimiter;
		self
	}

	/// Override the zero-based column index holding the identity name.
	pub fn with_column(mut self, column: usize) -> Self {
		self.column = column;
		self
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Read every identity name from the file, in file order.
	///
	/// The first line is a header and is skipped, as are trailing blank
	/// lines. Any other row with fewer than `column + 1` fields aborts
	/// the read with [`SourceError::MalformedRow`], including a blank
	/// line between data rows.
	pub fn read(&self) -> Result<Vec<String>, SourceError> {
		let contents = fs::read_to_string(&self.path)?;
		let mut names = Vec::new();

		for (index, row) in contents.trim_end().lines().enumerate() {
			if index == 0 {
				continue;
			}
			let fields: Vec<&str> = row.split(self.delimiter).collect();
			let Some(field) = fields.get(self.column) else {
				return Err(SourceError::MalformedRow {
					line: index + 1,
					columns: fields.len(),
					needed: self.column + 1,
				});
			};
			names.push(field.trim().to_string());
		}

		debug!(path = %self.path.display(), count = names.len(), "roster read");
		Ok(names)
	}
}

//! Result sets and row views.
//!
//! A `ResultSet` owns the library's result buffer and frees it exactly once
//! when dropped or released. `Row` and `Cell` borrow from it, so neither can
//! outlive the buffer.

use std::borrow::Cow;
use std::fmt;

use crate::codec::{raw_text, FromSql, Value};
use crate::error::{PqError, PqResult};
use crate::ffi::ResultHandle;
use crate::libpq::PqResultHandle;
use crate::types::{Format, Oid, PgType};

// ============================================================================
// Result Set
// ============================================================================

/// Rows returned by one statement.
pub struct ResultSet<R: ResultHandle = PqResultHandle> {
    handle: R,
    format: Format,
    rows: usize,
    fields: usize,
}

impl<R: ResultHandle> ResultSet<R> {
    /// Take ownership of a result buffer whose cells are in `format`.
    pub(crate) fn new(handle: R, format: Format) -> Self {
        let rows = handle.ntuples();
        let fields = handle.nfields();
        Self {
            handle,
            format,
            rows,
            fields,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn field_count(&self) -> usize {
        self.fields
    }

    /// Check if the result has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Encoding of every cell in this result.
    pub fn format(&self) -> Format {
        self.format
    }

    fn check_column(&self, column: usize) -> PqResult<()> {
        if column < self.fields {
            Ok(())
        } else {
            Err(PqError::ColumnOutOfRange {
                index: column,
                count: self.fields,
            })
        }
    }

    pub fn field_name(&self, column: usize) -> PqResult<Cow<'_, str>> {
        self.check_column(column)?;
        Ok(self.handle.field_name(column))
    }

    /// Raw type identifier the server reported for `column`.
    pub fn field_oid(&self, column: usize) -> PqResult<Oid> {
        self.check_column(column)?;
        Ok(self.handle.field_type(column))
    }

    /// Registered type of `column`; `UnknownType` if the OID is not registered.
    pub fn field_type(&self, column: usize) -> PqResult<PgType> {
        PgType::from_oid(self.field_oid(column)?)
    }

    /// Index of the first column named `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        (0..self.fields).find(|&column| self.handle.field_name(column) == name)
    }

    pub fn row(&self, index: usize) -> PqResult<Row<'_, R>> {
        if index < self.rows {
            Ok(Row { set: self, index })
        } else {
            Err(PqError::RowOutOfRange {
                index,
                count: self.rows,
            })
        }
    }

    pub fn rows(&self) -> Rows<'_, R> {
        Rows {
            set: self,
            next: 0,
        }
    }

    /// Free the result buffer now rather than at end of scope.
    pub fn release(self) {
        drop(self);
    }

    /// Callers must have range-checked `row` and `column`.
    fn cell_unchecked(&self, row: usize, column: usize) -> Cell<'_> {
        Cell {
            bytes: self.handle.value(row, column),
            is_null: self.handle.is_null(row, column),
        }
    }
}

impl<R: ResultHandle> fmt::Debug for ResultSet<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultSet")
            .field("rows", &self.rows)
            .field("fields", &self.fields)
            .field("format", &self.format)
            .finish()
    }
}

impl<R: ResultHandle> Drop for ResultSet<R> {
    fn drop(&mut self) {
        tracing::trace!(rows = self.rows, fields = self.fields, "releasing result set");
    }
}

/// Iterator over the rows of a `ResultSet`.
pub struct Rows<'a, R: ResultHandle> {
    set: &'a ResultSet<R>,
    next: usize,
}

impl<'a, R: ResultHandle> Iterator for Rows<'a, R> {
    type Item = Row<'a, R>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.set.rows {
            return None;
        }
        let row = Row {
            set: self.set,
            index: self.next,
        };
        self.next += 1;
        Some(row)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.set.rows - self.next;
        (remaining, Some(remaining))
    }
}

impl<R: ResultHandle> ExactSizeIterator for Rows<'_, R> {}

// ============================================================================
// Cell
// ============================================================================

/// The raw bytes of one (row, column), borrowed from the result buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell<'a> {
    bytes: &'a [u8],
    is_null: bool,
}

impl<'a> Cell<'a> {
    /// Raw bytes; empty for NULL.
    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn is_null(&self) -> bool {
        self.is_null
    }

    /// `None` for NULL, otherwise the bytes.
    pub fn as_option(&self) -> Option<&'a [u8]> {
        if self.is_null {
            None
        } else {
            Some(self.bytes)
        }
    }
}

// ============================================================================
// Row
// ============================================================================

/// One row of a `ResultSet`.
pub struct Row<'a, R: ResultHandle = PqResultHandle> {
    set: &'a ResultSet<R>,
    index: usize,
}

impl<R: ResultHandle> Clone for Row<'_, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R: ResultHandle> Copy for Row<'_, R> {}

impl<'a, R: ResultHandle> Row<'a, R> {
    /// Position of this row in its result set.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.set.fields
    }

    pub fn is_empty(&self) -> bool {
        self.set.fields == 0
    }

    pub fn result_set(&self) -> &'a ResultSet<R> {
        self.set
    }

    pub fn cell(&self, column: usize) -> PqResult<Cell<'a>> {
        self.set.check_column(column)?;
        Ok(self.set.cell_unchecked(self.index, column))
    }

    pub fn is_null(&self, column: usize) -> PqResult<bool> {
        self.cell(column).map(|cell| cell.is_null())
    }

    /// Decode `column` as `T`.
    ///
    /// Fails with `TypeMismatch` if the column's reported type is not one
    /// `T` accepts, and never coerces between types.
    pub fn get<T: FromSql>(&self, column: usize) -> PqResult<T> {
        let actual = self.set.field_type(column)?;
        if !T::accepts(actual) {
            return Err(PqError::TypeMismatch {
                expected: T::TYPE,
                actual,
            });
        }
        let cell = self.set.cell_unchecked(self.index, column);
        T::from_sql_nullable(self.set.format, cell.as_option())
    }

    /// Decode the first column named `name` as `T`.
    pub fn get_by_name<T: FromSql>(&self, name: &str) -> PqResult<T> {
        let column = self
            .set
            .column_index(name)
            .ok_or_else(|| PqError::ColumnNotFound {
                name: name.to_string(),
            })?;
        self.get(column)
    }

    /// Decode `column` by its reported type.
    ///
    /// `UnknownType` for unregistered types; use `cell` for the raw bytes.
    pub fn value(&self, column: usize) -> PqResult<Value> {
        let ty = self.set.field_type(column)?;
        let cell = self.set.cell_unchecked(self.index, column);
        Value::decode(ty, self.set.format, cell.as_option())
    }
}

impl<R: ResultHandle> fmt::Debug for Row<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Row")
            .field("index", &self.index)
            .field("fields", &self.set.fields)
            .finish()
    }
}

impl<R: ResultHandle> fmt::Display for Row<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for column in 0..self.set.fields {
            if column > 0 {
                f.write_str(", ")?;
            }
            let cell = self.set.cell_unchecked(self.index, column);
            let name = self.set.handle.field_name(column);
            match cell.as_option() {
                Some(bytes) => write!(f, "{}={}", name, raw_text(self.set.format, bytes))?,
                None => write!(f, "{}=NULL", name)?,
            }
        }
        f.write_str(")")
    }
}

//! Types for reading DBC tables
//!

use binrw::BinRead;
use byteorder::{ByteOrder, LittleEndian};
use std::{
    fmt::{self, Debug},
    fs::File,
    io::{Cursor, Read},
    path::Path,
    str,
};
use tracing::debug;

use crate::{
    error::{Error, OutOfRangeError, Result},
    types::{DbcHeader, FIELD_SIZE, HEADER_SIZE, MAGIC},
};

/// DBC table reader
///
/// The table keeps the buffer it was loaded from and decodes fields on request. Every read is a
/// pure function of the stored bytes.
///
/// ```no_run
/// fn list_maps(bytes: Vec<u8>) -> mangos_dbc::error::Result<()> {
///     let table = mangos_dbc::DbcTable::load(bytes)?;
///
///     for row in table.rows() {
///         println!("{}: {}", row.read_int(0)?, row.read_string(1)?);
///     }
///
///     Ok(())
/// }
/// ```
pub struct DbcTable {
    header: DbcHeader,
    data: Vec<u8>,
}

impl Debug for DbcTable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("DbcTable")
            .field("header", &self.header)
            .finish()
    }
}

impl DbcTable {
    /// Validate a complete table file and take ownership of it.
    pub fn load(data: impl Into<Vec<u8>>) -> Result<DbcTable> {
        let data = data.into();
        let actual = data.len() as u64;

        if data.len() < MAGIC.len() {
            return Err(Error::Truncated {
                expected: HEADER_SIZE as u64,
                actual,
            });
        }
        if data[..MAGIC.len()] != MAGIC {
            return Err(Error::InvalidFormat);
        }
        if data.len() < HEADER_SIZE {
            return Err(Error::Truncated {
                expected: HEADER_SIZE as u64,
                actual,
            });
        }

        let header = DbcHeader::read(&mut Cursor::new(&data[..HEADER_SIZE]))?;
        if !header.has_valid_layout() {
            return Err(Error::InvalidFormat);
        }
        let expected = header.file_size();
        if expected != actual {
            return Err(Error::Truncated { expected, actual });
        }

        debug!(
            records = header.record_count,
            fields = header.field_count,
            record_size = header.record_size,
            strings = header.string_block_size,
            "loaded dbc table"
        );

        Ok(DbcTable { header, data })
    }

    /// Read a whole table from `reader`.
    pub fn read<R: Read>(mut reader: R) -> Result<DbcTable> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::load(data)
    }

    /// Read the table file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<DbcTable> {
        Self::read(File::open(path)?)
    }

    /// The parsed table header
    pub fn header(&self) -> &DbcHeader {
        &self.header
    }

    /// Number of records in this table.
    pub fn len(&self) -> usize {
        self.header.record_count as usize
    }

    /// Whether this table contains no records
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of fields the header declares for each record
    pub fn field_count(&self) -> usize {
        self.header.field_count as usize
    }

    /// Size of one record in bytes
    pub fn record_size(&self) -> usize {
        self.header.record_size as usize
    }

    /// The raw string block
    pub fn string_block(&self) -> &[u8] {
        &self.data[self.header.string_block_offset()..]
    }

    /// Get a view of one record
    pub fn row(&self, index: usize) -> Result<Row<'_>> {
        if index >= self.len() {
            return Err(OutOfRangeError::Row {
                row: index,
                rows: self.len(),
            }
            .into());
        }
        Ok(Row { table: self, index })
    }

    /// Returns an iterator over every record, in file order.
    pub fn rows(&self) -> impl ExactSizeIterator<Item = Row<'_>> + '_ {
        (0..self.len()).map(move |index| Row { table: self, index })
    }

    fn field(&self, row: usize, column: usize) -> Result<&[u8]> {
        let rows = self.len();
        if row >= rows {
            return Err(OutOfRangeError::Row { row, rows }.into());
        }

        let stride = self.record_size();
        let start = column
            .checked_mul(FIELD_SIZE)
            .filter(|start| start.checked_add(FIELD_SIZE).is_some_and(|end| end <= stride))
            .ok_or(OutOfRangeError::Column { column, stride })?;

        let offset = HEADER_SIZE + row * stride + start;
        Ok(&self.data[offset..offset + FIELD_SIZE])
    }

    /// Read a field as a signed integer
    pub fn read_int(&self, row: usize, column: usize) -> Result<i32> {
        Ok(LittleEndian::read_i32(self.field(row, column)?))
    }

    /// Read a field as an unsigned integer
    pub fn read_uint(&self, row: usize, column: usize) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.field(row, column)?))
    }

    /// Read a field as a float
    pub fn read_float(&self, row: usize, column: usize) -> Result<f32> {
        Ok(LittleEndian::read_f32(self.field(row, column)?))
    }

    /// Read the raw bytes of the string a field points at, without the terminator.
    ///
    /// Offset 0 is the empty string, even when the string block is empty.
    pub fn read_bytes(&self, row: usize, column: usize) -> Result<&[u8]> {
        let offset = self.read_uint(row, column)?;
        self.string_at(offset)
    }

    /// Read the string a field points at
    pub fn read_string(&self, row: usize, column: usize) -> Result<&str> {
        Ok(str::from_utf8(self.read_bytes(row, column)?)?)
    }

    /// Read the string a field points at, failing when the field holds no string.
    pub fn read_required_string(&self, row: usize, column: usize) -> Result<&str> {
        if self.read_uint(row, column)? == 0 {
            return Err(OutOfRangeError::EmptyString { row, column }.into());
        }
        self.read_string(row, column)
    }

    fn string_at(&self, offset: u32) -> Result<&[u8]> {
        if offset == 0 {
            return Ok(&[]);
        }

        let tail = self
            .string_block()
            .get(offset as usize..)
            .ok_or(Error::CorruptMember { offset })?;
        let end = tail
            .iter()
            .position(|b| *b == 0)
            .ok_or(Error::CorruptMember { offset })?;

        Ok(&tail[..end])
    }
}

/// A view of one record of a [`DbcTable`]
#[derive(Clone, Copy)]
pub struct Row<'a> {
    table: &'a DbcTable,
    index: usize,
}

impl Debug for Row<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Row({})", self.index)
    }
}

impl<'a> Row<'a> {
    /// Position of the record in the table
    pub fn index(&self) -> usize {
        self.index
    }

    /// The table this record belongs to
    pub fn table(&self) -> &'a DbcTable {
        self.table
    }

    /// See [`DbcTable::read_int`]
    pub fn read_int(&self, column: usize) -> Result<i32> {
        self.table.read_int(self.index, column)
    }

    /// See [`DbcTable::read_uint`]
    pub fn read_uint(&self, column: usize) -> Result<u32> {
        self.table.read_uint(self.index, column)
    }

    /// See [`DbcTable::read_float`]
    pub fn read_float(&self, column: usize) -> Result<f32> {
        self.table.read_float(self.index, column)
    }

    /// See [`DbcTable::read_bytes`]
    pub fn read_bytes(&self, column: usize) -> Result<&'a [u8]> {
        self.table.read_bytes(self.index, column)
    }

    /// See [`DbcTable::read_string`]
    pub fn read_string(&self, column: usize) -> Result<&'a str> {
        self.table.read_string(self.index, column)
    }

    /// See [`DbcTable::read_required_string`]
    pub fn read_required_string(&self, column: usize) -> Result<&'a str> {
        self.table.read_required_string(self.index, column)
    }
}

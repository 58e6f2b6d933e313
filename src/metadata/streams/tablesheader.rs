//! The table stream header (`#~` or `#-`).
//!
//! Layout: reserved `u32`, major and minor version, `heapSizes`, reserved byte, the
//! `valid` and `sorted` bit masks and one row count per valid table. Rows of all tables
//! follow back to back in table order.
//!
//! # Reference
//! - [ECMA-335 II.24.2.6](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

use strum::IntoEnumIterator;

use crate::{
    file::io::read_le,
    metadata::tables::{RowReadable, TableId, TableInfo},
    Error::OutOfBounds,
    Result,
};

/// A parsed table stream header with row access.
pub struct TablesHeader<'a> {
    /// Major schema version, 2 for current runtimes
    pub major_version: u8,
    /// Minor schema version
    pub minor_version: u8,
    /// Bit mask of present tables
    pub valid: u64,
    /// Bit mask of sorted tables
    pub sorted: u64,
    /// Row counts and index widths
    pub info: TableInfo,
    data: &'a [u8],
    tables_offset: usize,
}

impl<'a> TablesHeader<'a> {
    /// Parses the header and row counts of the table stream `data`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the header or the row counts do not fit,
    /// and [`crate::Error::Malformed`] if no table is present.
    pub fn from(data: &'a [u8]) -> Result<TablesHeader<'a>> {
        if data.len() < 24 {
            return Err(OutOfBounds);
        }

        let valid = read_le::<u64>(&data[8..])?;
        if valid == 0 {
            return Err(malformed_error!("No valid rows in any of the tables"));
        }

        let heap_sizes = read_le::<u8>(&data[6..])?;
        let (info, tables_offset) = TableInfo::new(data, valid, heap_sizes)?;

        Ok(TablesHeader {
            major_version: read_le::<u8>(&data[4..])?,
            minor_version: read_le::<u8>(&data[5..])?,
            valid,
            sorted: read_le::<u64>(&data[16..])?,
            info,
            data,
            tables_offset,
        })
    }

    /// Number of tables present.
    #[must_use]
    pub fn table_count(&self) -> u32 {
        self.valid.count_ones()
    }

    /// Returns `true` if `table` is present.
    #[must_use]
    pub fn has_table(&self, table: TableId) -> bool {
        self.valid & table.mask() != 0
    }

    /// Number of rows in `table`.
    #[must_use]
    pub fn row_count(&self, table: TableId) -> u32 {
        self.info.rows(table)
    }

    /// Decodes every row of the table `T` lives in.
    ///
    /// # Errors
    /// Returns an error if the rows of any preceding table or of `T` itself run past the
    /// stream.
    pub fn rows<T: RowReadable>(&self) -> Result<Vec<T>> {
        let count = self.row_count(T::TABLE);
        if count == 0 {
            return Ok(Vec::new());
        }

        let mut offset = self.table_offset(T::TABLE)?;
        let row_size = self.info.row_size(T::TABLE) as usize;
        let end = (count as usize)
            .checked_mul(row_size)
            .and_then(|len| len.checked_add(offset))
            .ok_or(OutOfBounds)?;
        if end > self.data.len() {
            return Err(OutOfBounds);
        }

        let mut rows = Vec::with_capacity(count as usize);
        for _ in 0..count {
            rows.push(T::row_read(self.data, &mut offset, &self.info)?);
        }

        Ok(rows)
    }

    /// Offset of the first row of `table` within the stream.
    fn table_offset(&self, table: TableId) -> Result<usize> {
        let mut offset = self.tables_offset;

        for preceding in TableId::iter().take_while(|id| *id != table) {
            let size = (self.info.rows(preceding) as usize)
                .checked_mul(self.info.row_size(preceding) as usize)
                .ok_or(OutOfBounds)?;
            offset = offset.checked_add(size).ok_or(OutOfBounds)?;
        }

        if offset > self.data.len() {
            return Err(OutOfBounds);
        }

        Ok(offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::tables::{AssemblyRefRaw, HEAP_LARGE_STRINGS};

    fn stream(valid: u64, counts: &[u32], heap_sizes: u8, rows: &[u8]) -> Vec<u8> {
        let mut data = vec![0, 0, 0, 0, 2, 0, heap_sizes, 1];
        data.extend_from_slice(&valid.to_le_bytes());
        data.extend_from_slice(&0_u64.to_le_bytes());
        for count in counts {
            data.extend_from_slice(&count.to_le_bytes());
        }
        data.extend_from_slice(rows);
        data
    }

    #[test]
    fn rows_after_preceding_tables() {
        let valid = TableId::Module.mask() | TableId::TypeRef.mask() | TableId::AssemblyRef.mask();

        let mut rows = vec![0xEE_u8; 10]; // Module
        rows.extend_from_slice(&[0xDD; 12]); // two TypeRef rows
        rows.extend_from_slice(&[1, 0, 2, 0, 3, 0, 4, 0, 0, 0, 0, 0, 0, 0, 5, 0, 0, 0, 0, 0]);

        let data = stream(valid, &[1, 2, 1], 0, &rows);
        let header = TablesHeader::from(&data).unwrap();
        assert_eq!(header.major_version, 2);
        assert_eq!(header.table_count(), 3);
        assert!(header.has_table(TableId::TypeRef));
        assert!(!header.has_table(TableId::Assembly));

        let refs = header.rows::<AssemblyRefRaw>().unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].major_version, 1);
        assert_eq!(refs[0].revision_number, 4);
        assert_eq!(refs[0].name, 5);
    }

    #[test]
    fn large_string_heap_widens_rows() {
        let valid = TableId::Module.mask() | TableId::AssemblyRef.mask();
        let mut rows = vec![0_u8; 12]; // Module with a 4-byte string index
        rows.extend_from_slice(&[9, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        rows.extend_from_slice(&7_u32.to_le_bytes());
        rows.extend_from_slice(&[0; 6]);

        let data = stream(valid, &[1, 1], HEAP_LARGE_STRINGS, &rows);
        let header = TablesHeader::from(&data).unwrap();
        let refs = header.rows::<AssemblyRefRaw>().unwrap();
        assert_eq!(refs[0].major_version, 9);
        assert_eq!(refs[0].name, 7);
    }

    #[test]
    fn truncated_rows() {
        let valid = TableId::Module.mask() | TableId::AssemblyRef.mask();
        let data = stream(valid, &[1, 100], 0, &[0; 40]);
        let header = TablesHeader::from(&data).unwrap();
        assert!(matches!(header.rows::<AssemblyRefRaw>(), Err(OutOfBounds)));
    }

    #[test]
    fn empty_mask_is_malformed() {
        let data = stream(0, &[], 0, &[]);
        assert!(TablesHeader::from(&data).is_err());
        assert!(matches!(TablesHeader::from(&data[..10]), Err(OutOfBounds)));
    }
}

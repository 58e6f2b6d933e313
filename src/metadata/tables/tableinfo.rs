use crate::{
    file::io::read_le_at,
    metadata::tables::{CodedIndexType, TableId},
    Error::OutOfBounds,
    Result,
};

/// `heapSizes` bit: `#Strings` indexes are 4 bytes wide.
pub const HEAP_LARGE_STRINGS: u8 = 0x01;
/// `heapSizes` bit: `#GUID` indexes are 4 bytes wide.
pub const HEAP_LARGE_GUID: u8 = 0x02;
/// `heapSizes` bit: `#Blob` indexes are 4 bytes wide.
pub const HEAP_LARGE_BLOB: u8 = 0x04;
/// `heapSizes` bit: four extra bytes follow the row counts.
pub const HEAP_EXTRA_DATA: u8 = 0x40;

/// Row counts and index widths of one table stream.
///
/// Everything needed to compute a row size: how many rows each table holds and whether
/// heap indexes are 2 or 4 bytes wide.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableInfo {
    rows: [u32; 64],
    is_large_index_str: bool,
    is_large_index_guid: bool,
    is_large_index_blob: bool,
}

impl TableInfo {
    /// Reads the row counts following a table stream header.
    ///
    /// `data` is the whole table stream; the counts start at offset 24 and there is one
    /// `u32` per bit set in `valid`, in bit order. Returns the info together with the
    /// offset at which the first row starts.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the row counts run past `data`.
    pub fn new(data: &[u8], valid: u64, heap_sizes: u8) -> Result<(Self, usize)> {
        let mut rows = [0_u32; 64];
        let mut offset = 24;

        for (bit, count) in rows.iter_mut().enumerate() {
            if valid & (1_u64 << bit) != 0 {
                *count = read_le_at::<u32>(data, &mut offset)?;
            }
        }

        if heap_sizes & HEAP_EXTRA_DATA != 0 {
            offset += 4;
            if offset > data.len() {
                return Err(OutOfBounds);
            }
        }

        Ok((
            TableInfo {
                rows,
                is_large_index_str: heap_sizes & HEAP_LARGE_STRINGS != 0,
                is_large_index_guid: heap_sizes & HEAP_LARGE_GUID != 0,
                is_large_index_blob: heap_sizes & HEAP_LARGE_BLOB != 0,
            },
            offset,
        ))
    }

    /// Builds an info from explicit row counts.
    #[cfg(test)]
    pub fn new_test(valid_tables: &[(TableId, u32)], large_heaps: bool) -> Self {
        let mut rows = [0_u32; 64];
        for (table, count) in valid_tables {
            rows[*table as usize] = *count;
        }

        TableInfo {
            rows,
            is_large_index_str: large_heaps,
            is_large_index_guid: large_heaps,
            is_large_index_blob: large_heaps,
        }
    }

    /// Row count of `table`.
    #[must_use]
    pub fn rows(&self, table: TableId) -> u32 {
        self.rows[table as usize]
    }

    /// Row count of the table with bit `bit`, including tables without a [`TableId`].
    #[must_use]
    pub fn rows_by_bit(&self, bit: usize) -> u32 {
        self.rows.get(bit).copied().unwrap_or(0)
    }

    /// Returns `true` if `#Strings` indexes are 4 bytes wide.
    #[must_use]
    pub fn is_large_str(&self) -> bool {
        self.is_large_index_str
    }

    /// Returns `true` if `#GUID` indexes are 4 bytes wide.
    #[must_use]
    pub fn is_large_guid(&self) -> bool {
        self.is_large_index_guid
    }

    /// Returns `true` if `#Blob` indexes are 4 bytes wide.
    #[must_use]
    pub fn is_large_blob(&self) -> bool {
        self.is_large_index_blob
    }

    /// Width of a `#Strings` index.
    #[must_use]
    pub fn str_bytes(&self) -> u32 {
        if self.is_large_index_str {
            4
        } else {
            2
        }
    }

    /// Width of a `#GUID` index.
    #[must_use]
    pub fn guid_bytes(&self) -> u32 {
        if self.is_large_index_guid {
            4
        } else {
            2
        }
    }

    /// Width of a `#Blob` index.
    #[must_use]
    pub fn blob_bytes(&self) -> u32 {
        if self.is_large_index_blob {
            4
        } else {
            2
        }
    }

    /// Width of a simple index into `table`.
    #[must_use]
    pub fn table_index_bytes(&self, table: TableId) -> u32 {
        if self.rows(table) > u32::from(u16::MAX) {
            4
        } else {
            2
        }
    }

    /// Width of a coded index of kind `coded_index_type`.
    #[must_use]
    pub fn coded_index_bytes(&self, coded_index_type: CodedIndexType) -> u32 {
        let limit = 1_u32 << (16 - coded_index_type.tag_bits());
        let max_rows = coded_index_type
            .tables()
            .iter()
            .map(|table| self.rows(*table))
            .max()
            .unwrap_or(0);

        if max_rows < limit {
            2
        } else {
            4
        }
    }

    /// Size in bytes of one row of `table` (ECMA-335 II.22).
    #[must_use]
    #[rustfmt::skip]
    pub fn row_size(&self, table: TableId) -> u32 {
        use CodedIndexType as Ci;

        let s = self.str_bytes();
        let g = self.guid_bytes();
        let b = self.blob_bytes();
        let idx = |table| self.table_index_bytes(table);
        let ci = |kind| self.coded_index_bytes(kind);

        match table {
            TableId::Module                 => 2 + s + g + g + g,
            TableId::TypeRef                => ci(Ci::ResolutionScope) + s + s,
            TableId::TypeDef                => 4 + s + s + ci(Ci::TypeDefOrRef) + idx(TableId::Field) + idx(TableId::MethodDef),
            TableId::FieldPtr               => idx(TableId::Field),
            TableId::Field                  => 2 + s + b,
            TableId::MethodPtr              => idx(TableId::MethodDef),
            TableId::MethodDef              => 4 + 2 + 2 + s + b + idx(TableId::Param),
            TableId::ParamPtr               => idx(TableId::Param),
            TableId::Param                  => 2 + 2 + s,
            TableId::InterfaceImpl          => idx(TableId::TypeDef) + ci(Ci::TypeDefOrRef),
            TableId::MemberRef              => ci(Ci::MemberRefParent) + s + b,
            TableId::Constant               => 1 + 1 + ci(Ci::HasConstant) + b,
            TableId::CustomAttribute        => ci(Ci::HasCustomAttribute) + ci(Ci::CustomAttributeType) + b,
            TableId::FieldMarshal           => ci(Ci::HasFieldMarshal) + b,
            TableId::DeclSecurity           => 2 + ci(Ci::HasDeclSecurity) + b,
            TableId::ClassLayout            => 2 + 4 + idx(TableId::TypeDef),
            TableId::FieldLayout            => 4 + idx(TableId::Field),
            TableId::StandAloneSig          => b,
            TableId::EventMap               => idx(TableId::TypeDef) + idx(TableId::Event),
            TableId::EventPtr               => idx(TableId::Event),
            TableId::Event                  => 2 + s + ci(Ci::TypeDefOrRef),
            TableId::PropertyMap            => idx(TableId::TypeDef) + idx(TableId::Property),
            TableId::PropertyPtr            => idx(TableId::Property),
            TableId::Property               => 2 + s + b,
            TableId::MethodSemantics        => 2 + idx(TableId::MethodDef) + ci(Ci::HasSemantics),
            TableId::MethodImpl             => idx(TableId::TypeDef) + ci(Ci::MethodDefOrRef) + ci(Ci::MethodDefOrRef),
            TableId::ModuleRef              => s,
            TableId::TypeSpec               => b,
            TableId::ImplMap                => 2 + ci(Ci::MemberForwarded) + s + idx(TableId::ModuleRef),
            TableId::FieldRVA               => 4 + idx(TableId::Field),
            TableId::EncLog                 => 4 + 4,
            TableId::EncMap                 => 4,
            TableId::Assembly               => 4 + 2 + 2 + 2 + 2 + 4 + b + s + s,
            TableId::AssemblyProcessor      => 4,
            TableId::AssemblyOS             => 4 + 4 + 4,
            TableId::AssemblyRef            => 2 + 2 + 2 + 2 + 4 + b + s + s + b,
            TableId::AssemblyRefProcessor   => 4 + idx(TableId::AssemblyRef),
            TableId::AssemblyRefOS          => 4 + 4 + 4 + idx(TableId::AssemblyRef),
            TableId::File                   => 4 + s + b,
            TableId::ExportedType           => 4 + 4 + s + s + ci(Ci::Implementation),
            TableId::ManifestResource       => 4 + 4 + s + ci(Ci::Implementation),
            TableId::NestedClass            => idx(TableId::TypeDef) + idx(TableId::TypeDef),
            TableId::GenericParam           => 2 + 2 + ci(Ci::TypeOrMethodDef) + s,
            TableId::MethodSpec             => ci(Ci::MethodDefOrRef) + b,
            TableId::GenericParamConstraint => idx(TableId::GenericParam) + ci(Ci::TypeDefOrRef),
        }
    }
}

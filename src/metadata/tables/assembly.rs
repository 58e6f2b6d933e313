use crate::{
    file::io::{read_le_at, read_le_at_dyn},
    identity::{AssemblyIdentity, AssemblyVersion, PublicKeyToken},
    metadata::{
        streams::{Blob, Strings},
        tables::{RowReadable, TableId, TableInfo},
    },
    Result,
};

/// `AssemblyFlags.PublicKey`: the key blob holds a full public key rather than a token.
pub const ASSEMBLY_FLAG_PUBLIC_KEY: u32 = 0x0001;

/// A raw row of the `Assembly` table (0x20), heap indexes unresolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssemblyRaw {
    /// `AssemblyHashAlgorithm`
    pub hash_alg_id: u32,
    /// Major version
    pub major_version: u16,
    /// Minor version
    pub minor_version: u16,
    /// Build number
    pub build_number: u16,
    /// Revision number
    pub revision_number: u16,
    /// `AssemblyFlags`
    pub flags: u32,
    /// `#Blob` index of the full public key, 0 if unsigned
    pub public_key: u32,
    /// `#Strings` index of the name
    pub name: u32,
    /// `#Strings` index of the culture
    pub culture: u32,
}

/// A raw row of the `AssemblyRef` table (0x23), heap indexes unresolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssemblyRefRaw {
    /// Major version
    pub major_version: u16,
    /// Minor version
    pub minor_version: u16,
    /// Build number
    pub build_number: u16,
    /// Revision number
    pub revision_number: u16,
    /// `AssemblyFlags`
    pub flags: u32,
    /// `#Blob` index of the public key or token
    pub public_key_or_token: u32,
    /// `#Strings` index of the name
    pub name: u32,
    /// `#Strings` index of the culture
    pub culture: u32,
    /// `#Blob` index of the hash value
    pub hash_value: u32,
}

impl AssemblyRaw {
    /// Resolves the heap indexes into the identity the assembly declares.
    ///
    /// # Errors
    /// Returns an error if a heap index is invalid.
    pub fn to_identity(&self, strings: &Strings, blob: Option<&Blob>) -> Result<AssemblyIdentity> {
        let mut identity = AssemblyIdentity::new(
            strings.get(self.name as usize)?,
            AssemblyVersion::new(
                self.major_version,
                self.minor_version,
                self.build_number,
                self.revision_number,
            ),
        )
        .with_culture(strings.get(self.culture as usize)?);

        let key = blob_at(blob, self.public_key)?;
        if !key.is_empty() {
            identity.public_key_token = Some(PublicKeyToken::from_public_key(key));
        }

        Ok(identity)
    }
}

impl AssemblyRefRaw {
    /// Resolves the heap indexes into the referenced identity.
    ///
    /// A full public key is reduced to its token. A blob without the public-key flag is
    /// taken as a token when it is 8 bytes long, and as a key otherwise.
    ///
    /// # Errors
    /// Returns an error if a heap index is invalid.
    pub fn to_identity(&self, strings: &Strings, blob: Option<&Blob>) -> Result<AssemblyIdentity> {
        let mut identity = AssemblyIdentity::new(
            strings.get(self.name as usize)?,
            AssemblyVersion::new(
                self.major_version,
                self.minor_version,
                self.build_number,
                self.revision_number,
            ),
        )
        .with_culture(strings.get(self.culture as usize)?);

        let key_or_token = blob_at(blob, self.public_key_or_token)?;
        identity.public_key_token = match PublicKeyToken::from_slice(key_or_token) {
            _ if key_or_token.is_empty() => None,
            Some(token) if self.flags & ASSEMBLY_FLAG_PUBLIC_KEY == 0 => Some(token),
            _ => Some(PublicKeyToken::from_public_key(key_or_token)),
        };

        Ok(identity)
    }
}

fn blob_at<'a>(blob: Option<&Blob<'a>>, index: u32) -> Result<&'a [u8]> {
    match (blob, index) {
        (_, 0) => Ok(&[]),
        (Some(blob), index) => blob.get(index as usize),
        (None, index) => Err(malformed_error!(
            "Blob index {} used, but there is no #Blob heap",
            index
        )),
    }
}

impl RowReadable for AssemblyRaw {
    const TABLE: TableId = TableId::Assembly;

    fn row_read(data: &[u8], offset: &mut usize, sizes: &TableInfo) -> Result<Self> {
        Ok(AssemblyRaw {
            hash_alg_id: read_le_at::<u32>(data, offset)?,
            major_version: read_le_at::<u16>(data, offset)?,
            minor_version: read_le_at::<u16>(data, offset)?,
            build_number: read_le_at::<u16>(data, offset)?,
            revision_number: read_le_at::<u16>(data, offset)?,
            flags: read_le_at::<u32>(data, offset)?,
            public_key: read_le_at_dyn(data, offset, sizes.is_large_blob())?,
            name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            culture: read_le_at_dyn(data, offset, sizes.is_large_str())?,
        })
    }
}

impl RowReadable for AssemblyRefRaw {
    const TABLE: TableId = TableId::AssemblyRef;

    fn row_read(data: &[u8], offset: &mut usize, sizes: &TableInfo) -> Result<Self> {
        Ok(AssemblyRefRaw {
            major_version: read_le_at::<u16>(data, offset)?,
            minor_version: read_le_at::<u16>(data, offset)?,
            build_number: read_le_at::<u16>(data, offset)?,
            revision_number: read_le_at::<u16>(data, offset)?,
            flags: read_le_at::<u32>(data, offset)?,
            public_key_or_token: read_le_at_dyn(data, offset, sizes.is_large_blob())?,
            name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            culture: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            hash_value: read_le_at_dyn(data, offset, sizes.is_large_blob())?,
        })
    }
}

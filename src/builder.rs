//! Emits minimal managed PE images.
//!
//! [`ImageBuilder`] writes a complete, loadable image: DOS header, PE32 or PE32+ headers,
//! a single `.text` section holding the CLI header and a metadata root with `#~`,
//! `#Strings`, `#Blob` and `#GUID` streams. The table stream carries a `Module` row, the
//! `Assembly` row and one `AssemblyRef` row per reference. No IL, no types.
//!
//! The images are small but structurally real: goblin parses them, the sniffer accepts
//! them and [`crate::loader::PeMetadataLoader`] reads them back. Tests, benches and fuzz
//! corpora use them as fixtures.
//!
//! # Examples
//!
//! ```rust
//! use dotdeps::builder::ImageBuilder;
//! use dotdeps::identity::{AssemblyIdentity, AssemblyVersion};
//!
//! let image = ImageBuilder::new("App")
//!     .version(AssemblyVersion::new(1, 2, 0, 0))
//!     .reference(AssemblyIdentity::new("Lib", AssemblyVersion::new(2, 0, 0, 0)))
//!     .build();
//! assert!(dotdeps::sniffer::is_loadable_binary(&image));
//! ```

use std::{collections::HashMap, fs, path::Path};

use crate::{
    file::io::write_le_at,
    identity::{AssemblyIdentity, AssemblyVersion, PublicKeyToken},
    metadata::{TableId, ASSEMBLY_FLAG_PUBLIC_KEY, METADATA_SIGNATURE},
    Result,
};

const NT_HEADERS_OFFSET: usize = 0x80;
const FILE_ALIGNMENT: u32 = 0x200;
const SECTION_ALIGNMENT: u32 = 0x2000;
const TEXT_RVA: u32 = 0x2000;
const MIN_IMAGE_SIZE: usize = 0x1000;
const CLI_HEADER_SIZE: u32 = 72;
const CLR_DIRECTORY_INDEX: usize = 14;
const RUNTIME_VERSION: &str = "v4.0.30319";
const SHA1_HASH_ALGORITHM: u32 = 0x8004;

struct ReferenceRow {
    identity: AssemblyIdentity,
    public_key: Option<Vec<u8>>,
}

/// Builder for a minimal managed image declaring one assembly and its references.
pub struct ImageBuilder {
    name: String,
    version: AssemblyVersion,
    culture: Option<String>,
    public_key: Option<Vec<u8>>,
    references: Vec<ReferenceRow>,
    pe32_plus: bool,
    managed: bool,
    large_heaps: bool,
}

impl ImageBuilder {
    /// Starts an image for assembly `name`, version 1.0.0.0, culture neutral, unsigned.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: AssemblyVersion::new(1, 0, 0, 0),
            culture: None,
            public_key: None,
            references: Vec::new(),
            pe32_plus: false,
            managed: true,
            large_heaps: false,
        }
    }

    /// Starts an image declaring exactly `identity`.
    ///
    /// The declared token can only come from a full public key, so a token on
    /// `identity` is ignored; use [`ImageBuilder::public_key`] for signed assemblies.
    pub fn from_identity(identity: &AssemblyIdentity) -> Self {
        let mut builder = Self::new(identity.name.clone()).version(identity.version);
        builder.culture = identity.culture.clone();
        builder
    }

    /// Sets the declared version.
    #[must_use]
    pub fn version(mut self, version: AssemblyVersion) -> Self {
        self.version = version;
        self
    }

    /// Sets the declared culture.
    #[must_use]
    pub fn culture(mut self, culture: impl Into<String>) -> Self {
        self.culture = Some(culture.into());
        self
    }

    /// Signs the declared identity with a full public key.
    #[must_use]
    pub fn public_key(mut self, key: Vec<u8>) -> Self {
        self.public_key = Some(key);
        self
    }

    /// Adds an `AssemblyRef` row. The reference token, if any, is stored as a token.
    #[must_use]
    pub fn reference(mut self, identity: AssemblyIdentity) -> Self {
        self.references.push(ReferenceRow {
            identity,
            public_key: None,
        });
        self
    }

    /// Adds an `AssemblyRef` row that stores a full public key instead of a token.
    #[must_use]
    pub fn reference_with_public_key(mut self, identity: AssemblyIdentity, key: Vec<u8>) -> Self {
        self.references.push(ReferenceRow {
            identity,
            public_key: Some(key),
        });
        self
    }

    /// Emits PE32+ headers with an AMD64 machine type.
    #[must_use]
    pub fn pe32_plus(mut self) -> Self {
        self.pe32_plus = true;
        self
    }

    /// Leaves the CLR runtime header directory empty, producing a native image.
    #[must_use]
    pub fn native(mut self) -> Self {
        self.managed = false;
        self
    }

    /// Marks all heaps as large so every heap index is written with 4 bytes.
    #[must_use]
    pub fn large_heaps(mut self) -> Self {
        self.large_heaps = true;
        self
    }

    /// The identity the built image declares, with the token derived from the key.
    #[must_use]
    pub fn identity(&self) -> AssemblyIdentity {
        AssemblyIdentity {
            name: self.name.clone(),
            version: self.version,
            culture: self.culture.clone(),
            public_key_token: self
                .public_key
                .as_deref()
                .map(PublicKeyToken::from_public_key),
        }
    }

    /// Produces the image bytes.
    #[must_use]
    pub fn build(&self) -> Vec<u8> {
        let section = self.text_section();
        let raw_size = align(section.len(), FILE_ALIGNMENT as usize);
        let image_len = (FILE_ALIGNMENT as usize + raw_size).max(MIN_IMAGE_SIZE);

        let mut image = vec![0_u8; image_len];
        self.write_headers(&mut image, section.len(), raw_size);
        image[FILE_ALIGNMENT as usize..FILE_ALIGNMENT as usize + section.len()]
            .copy_from_slice(&section);
        image
    }

    /// Writes the image to `path`.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file cannot be written.
    pub fn write(&self, path: &Path) -> Result<()> {
        fs::write(path, self.build())?;
        Ok(())
    }

    fn write_headers(&self, image: &mut [u8], section_len: usize, raw_size: usize) {
        let mut header = HeaderWriter::new(image);

        header.at(0).bytes(b"MZ");
        header.at(0x3C).u32(NT_HEADERS_OFFSET as u32);

        let optional_size: u16 = if self.pe32_plus { 240 } else { 224 };
        let machine: u16 = if self.pe32_plus { 0x8664 } else { 0x014C };
        let characteristics: u16 = if self.pe32_plus { 0x2022 } else { 0x2102 };

        header
            .at(NT_HEADERS_OFFSET)
            .bytes(b"PE\0\0")
            .u16(machine)
            .u16(1)
            .u32(0)
            .u32(0)
            .u32(0)
            .u16(optional_size)
            .u16(characteristics);

        let optional = NT_HEADERS_OFFSET + 24;
        let image_size = align(TEXT_RVA as usize + section_len, SECTION_ALIGNMENT as usize);

        header
            .at(optional)
            .u16(if self.pe32_plus { 0x020B } else { 0x010B })
            .u8(8)
            .u8(0)
            .u32(raw_size as u32)
            .u32(0)
            .u32(0)
            .u32(0)
            .u32(TEXT_RVA);
        if self.pe32_plus {
            header.u64(0x0001_8000_0000);
        } else {
            header.u32(0).u32(0x1000_0000);
        }
        header
            .u32(SECTION_ALIGNMENT)
            .u32(FILE_ALIGNMENT)
            .u16(4)
            .u16(0)
            .u16(0)
            .u16(0)
            .u16(4)
            .u16(0)
            .u32(0)
            .u32(image_size as u32)
            .u32(FILE_ALIGNMENT)
            .u32(0)
            .u16(3)
            .u16(0x8540);
        for value in [0x0010_0000_u64, 0x1000, 0x0010_0000, 0x1000] {
            if self.pe32_plus {
                header.u64(value);
            } else {
                header.u32(value as u32);
            }
        }
        header.u32(0).u32(16);

        let directories = header.position();
        if self.managed {
            header
                .at(directories + CLR_DIRECTORY_INDEX * 8)
                .u32(TEXT_RVA)
                .u32(CLI_HEADER_SIZE);
        }

        header
            .at(optional + usize::from(optional_size))
            .bytes(b".text\0\0\0")
            .u32(section_len as u32)
            .u32(TEXT_RVA)
            .u32(raw_size as u32)
            .u32(FILE_ALIGNMENT)
            .u32(0)
            .u32(0)
            .u16(0)
            .u16(0)
            .u32(0x6000_0020);
    }

    fn text_section(&self) -> Vec<u8> {
        let metadata = self.metadata_root();
        let metadata_rva = TEXT_RVA + CLI_HEADER_SIZE;

        let mut section = Vec::with_capacity(CLI_HEADER_SIZE as usize + metadata.len());
        push_u32(&mut section, CLI_HEADER_SIZE);
        push_u16(&mut section, 2);
        push_u16(&mut section, 5);
        push_u32(&mut section, metadata_rva);
        push_u32(&mut section, metadata.len() as u32);
        // ILONLY
        push_u32(&mut section, 0x0000_0001);
        section.resize(CLI_HEADER_SIZE as usize, 0);
        section.extend_from_slice(&metadata);
        section
    }

    fn metadata_root(&self) -> Vec<u8> {
        let mut strings = StringHeap::new();
        let mut blobs = BlobHeap::new();

        let tables = self.table_stream(&mut strings, &mut blobs);
        let strings = strings.into_bytes();
        let blobs = blobs.into_bytes();
        let guids = vec![0x42_u8; 16];

        let streams: [(&str, &[u8]); 4] = [
            ("#~", &tables),
            ("#Strings", &strings),
            ("#Blob", &blobs),
            ("#GUID", &guids),
        ];

        let version_len = align(RUNTIME_VERSION.len() + 1, 4);
        let headers_len: usize = streams
            .iter()
            .map(|(name, _)| 8 + align(name.len() + 1, 4))
            .sum();
        let mut data_offset = 16 + version_len + 4 + headers_len;

        let mut root = Vec::new();
        push_u32(&mut root, METADATA_SIGNATURE);
        push_u16(&mut root, 1);
        push_u16(&mut root, 1);
        push_u32(&mut root, 0);
        push_u32(&mut root, version_len as u32);
        root.extend_from_slice(RUNTIME_VERSION.as_bytes());
        root.resize(16 + version_len, 0);
        push_u16(&mut root, 0);
        push_u16(&mut root, streams.len() as u16);

        for (name, data) in &streams {
            let size = align(data.len(), 4);
            push_u32(&mut root, data_offset as u32);
            push_u32(&mut root, size as u32);
            root.extend_from_slice(name.as_bytes());
            let padded = root.len() + align(name.len() + 1, 4) - name.len();
            root.resize(padded, 0);
            data_offset += size;
        }

        for (_, data) in &streams {
            root.extend_from_slice(data);
            let padded = align(root.len(), 4);
            root.resize(padded, 0);
        }

        root
    }

    fn table_stream(&self, strings: &mut StringHeap, blobs: &mut BlobHeap) -> Vec<u8> {
        let large = self.large_heaps;
        let mut rows = Vec::new();

        // Module
        push_u16(&mut rows, 0);
        push_index(&mut rows, strings.add(&format!("{}.dll", self.name)), large);
        push_index(&mut rows, 1, large);
        push_index(&mut rows, 0, large);
        push_index(&mut rows, 0, large);

        // Assembly
        push_u32(&mut rows, SHA1_HASH_ALGORITHM);
        push_version(&mut rows, &self.version);
        let flags = if self.public_key.is_some() {
            ASSEMBLY_FLAG_PUBLIC_KEY
        } else {
            0
        };
        push_u32(&mut rows, flags);
        push_index(
            &mut rows,
            blobs.add(self.public_key.as_deref().unwrap_or_default()),
            large,
        );
        push_index(&mut rows, strings.add(&self.name), large);
        push_index(
            &mut rows,
            strings.add(self.culture.as_deref().unwrap_or_default()),
            large,
        );

        for reference in &self.references {
            let identity = &reference.identity;
            push_version(&mut rows, &identity.version);
            let (flags, key_or_token) = match (&reference.public_key, &identity.public_key_token) {
                (Some(key), _) => (ASSEMBLY_FLAG_PUBLIC_KEY, key.clone()),
                (None, Some(token)) => (0, token.as_bytes().to_vec()),
                (None, None) => (0, Vec::new()),
            };
            push_u32(&mut rows, flags);
            push_index(&mut rows, blobs.add(&key_or_token), large);
            push_index(&mut rows, strings.add(&identity.name), large);
            push_index(
                &mut rows,
                strings.add(identity.culture.as_deref().unwrap_or_default()),
                large,
            );
            push_index(&mut rows, 0, large);
        }

        let mut valid = (1_u64 << TableId::Module as u64) | (1_u64 << TableId::Assembly as u64);
        if !self.references.is_empty() {
            valid |= 1_u64 << TableId::AssemblyRef as u64;
        }

        let mut stream = Vec::with_capacity(24 + 12 + rows.len());
        push_u32(&mut stream, 0);
        stream.push(2);
        stream.push(0);
        stream.push(if large { 0x07 } else { 0x00 });
        stream.push(1);
        stream.extend_from_slice(&valid.to_le_bytes());
        stream.extend_from_slice(&0x0000_1600_3301_FA00_u64.to_le_bytes());
        push_u32(&mut stream, 1);
        push_u32(&mut stream, 1);
        if !self.references.is_empty() {
            push_u32(&mut stream, self.references.len() as u32);
        }
        stream.extend_from_slice(&rows);
        stream
    }
}

struct StringHeap {
    data: Vec<u8>,
    offsets: HashMap<String, u32>,
}

impl StringHeap {
    fn new() -> Self {
        Self {
            data: vec![0],
            offsets: HashMap::new(),
        }
    }

    fn add(&mut self, value: &str) -> u32 {
        if value.is_empty() {
            return 0;
        }

        if let Some(&offset) = self.offsets.get(value) {
            return offset;
        }

        let offset = self.data.len() as u32;
        self.data.extend_from_slice(value.as_bytes());
        self.data.push(0);
        self.offsets.insert(value.to_string(), offset);
        offset
    }

    fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

struct BlobHeap {
    data: Vec<u8>,
}

impl BlobHeap {
    fn new() -> Self {
        Self { data: vec![0] }
    }

    fn add(&mut self, value: &[u8]) -> u32 {
        if value.is_empty() {
            return 0;
        }

        let offset = self.data.len() as u32;
        push_compressed_uint(&mut self.data, value.len() as u32);
        self.data.extend_from_slice(value);
        offset
    }

    fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

/// Positioned writer over the header area. Writes outside the buffer are dropped, which
/// cannot happen for the fixed layout emitted here.
struct HeaderWriter<'a> {
    data: &'a mut [u8],
    position: usize,
}

impl<'a> HeaderWriter<'a> {
    fn new(data: &'a mut [u8]) -> Self {
        Self { data, position: 0 }
    }

    fn position(&self) -> usize {
        self.position
    }

    fn at(&mut self, position: usize) -> &mut Self {
        self.position = position;
        self
    }

    fn bytes(&mut self, value: &[u8]) -> &mut Self {
        if let Some(target) = self.data.get_mut(self.position..self.position + value.len()) {
            target.copy_from_slice(value);
        }
        self.position += value.len();
        self
    }

    fn u8(&mut self, value: u8) -> &mut Self {
        let _ = write_le_at(self.data, &mut self.position, value);
        self
    }

    fn u16(&mut self, value: u16) -> &mut Self {
        let _ = write_le_at(self.data, &mut self.position, value);
        self
    }

    fn u32(&mut self, value: u32) -> &mut Self {
        let _ = write_le_at(self.data, &mut self.position, value);
        self
    }

    fn u64(&mut self, value: u64) -> &mut Self {
        let _ = write_le_at(self.data, &mut self.position, value);
        self
    }
}

fn align(value: usize, alignment: usize) -> usize {
    value.div_ceil(alignment) * alignment
}

fn push_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn push_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn push_index(out: &mut Vec<u8>, value: u32, large: bool) {
    if large {
        push_u32(out, value);
    } else {
        push_u16(out, value as u16);
    }
}

fn push_version(out: &mut Vec<u8>, version: &AssemblyVersion) {
    push_u16(out, version.major);
    push_u16(out, version.minor);
    push_u16(out, version.build);
    push_u16(out, version.revision);
}

fn push_compressed_uint(out: &mut Vec<u8>, value: u32) {
    if value < 0x80 {
        out.push(value as u8);
    } else if value < 0x4000 {
        out.push(0x80 | (value >> 8) as u8);
        out.push(value as u8);
    } else {
        out.extend_from_slice(&(value | 0xC000_0000).to_be_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::parser::Parser;

    #[test]
    fn image_is_page_sized_at_least() {
        let image = ImageBuilder::new("Tiny").build();
        assert!(image.len() >= MIN_IMAGE_SIZE);
        assert_eq!(&image[..2], b"MZ");
        assert_eq!(&image[NT_HEADERS_OFFSET..NT_HEADERS_OFFSET + 4], b"PE\0\0");
    }

    #[test]
    fn many_references_grow_the_image() {
        let mut builder = ImageBuilder::new("Wide");
        for i in 0..400 {
            builder = builder.reference(AssemblyIdentity::new(
                format!("Dependency.Number{i}"),
                AssemblyVersion::new(1, 0, 0, 0),
            ));
        }
        let image = builder.build();
        assert!(image.len() > MIN_IMAGE_SIZE);
        assert_eq!(image.len() % FILE_ALIGNMENT as usize, 0);
    }

    #[test]
    fn compressed_lengths() {
        for value in [0_u32, 0x7F, 0x80, 0x3FFF, 0x4000, 0x1FFF_FFFF] {
            let mut encoded = Vec::new();
            push_compressed_uint(&mut encoded, value);
            let mut parser = Parser::new(&encoded);
            assert_eq!(parser.read_compressed_uint().unwrap(), value);
        }
    }

    #[test]
    fn heaps_deduplicate_strings() {
        let mut strings = StringHeap::new();
        let a = strings.add("System.Runtime");
        let b = strings.add("System.Runtime");
        assert_eq!(a, b);
        assert_eq!(strings.add(""), 0);
    }

    #[test]
    fn declared_identity_uses_key_token() {
        let key = vec![0x00, 0x24, 0x00, 0x00, 0x04, 0x80];
        let builder = ImageBuilder::new("Signed").public_key(key.clone());
        assert_eq!(
            builder.identity().public_key_token,
            Some(PublicKeyToken::from_public_key(&key))
        );
    }
}

//! Cheap detection of managed binaries.
//!
//! The sniffer looks at the first page of a file only. It follows the legacy DOS header
//! to the NT headers, picks the 32- or 64-bit optional header layout from the machine
//! type and magic, and reports whether the CLR runtime header directory has a non-zero
//! size. That directory is what separates a managed image from a native one.
//!
//! The check never fails: truncated or nonsensical headers simply yield `false`.
//!
//! # Examples
//!
//! ```rust,no_run
//! use dotdeps::sniffer::is_loadable_file;
//! use std::path::Path;
//!
//! if is_loadable_file(Path::new("bin/App.dll")) {
//!     println!("managed");
//! }
//! ```

use std::{fs, io::Read, path::Path};

use crate::file::io::read_le_at;

/// Number of bytes inspected.
pub const PAGE_SIZE: usize = 4096;

const E_LFANEW_OFFSET: usize = 0x3C;
const FILE_HEADER_SIZE: usize = 20;
const PE_SIGNATURE_SIZE: usize = 4;

const MACHINE_IA64: u16 = 0x0200;
const MACHINE_AMD64: u16 = 0x8664;
const MACHINE_ARM64: u16 = 0xAA64;

const PE32_PLUS_MAGIC: u16 = 0x020B;

/// Offset of the CLR runtime header directory inside a PE32 optional header.
const CLR_DIRECTORY_PE32: usize = 208;
/// Offset of the CLR runtime header directory inside a PE32+ optional header.
const CLR_DIRECTORY_PE32_PLUS: usize = 224;

/// Returns `true` if `page` starts a plausibly loadable managed image.
///
/// `page` is expected to hold the first [`PAGE_SIZE`] bytes of a file. Shorter input is
/// rejected.
#[must_use]
pub fn is_loadable_binary(page: &[u8]) -> bool {
    if page.len() < PAGE_SIZE {
        return false;
    }

    clr_directory_size(&page[..PAGE_SIZE]).is_some_and(|size| size > 0)
}

/// Reads the first page of the file at `path` and applies [`is_loadable_binary`].
///
/// Files shorter than a page are rejected without being opened, unless `path` is a
/// symbolic link: the link's own length says nothing about its target, so the check
/// relies on the page read instead.
#[must_use]
pub fn is_loadable_file(path: &Path) -> bool {
    let Ok(link_metadata) = fs::symlink_metadata(path) else {
        return false;
    };

    if !link_metadata.file_type().is_symlink() && link_metadata.len() < PAGE_SIZE as u64 {
        return false;
    }

    let Ok(mut file) = fs::File::open(path) else {
        return false;
    };

    let mut page = vec![0_u8; PAGE_SIZE];
    if file.read_exact(&mut page).is_err() {
        return false;
    }

    is_loadable_binary(&page)
}

fn clr_directory_size(page: &[u8]) -> Option<u32> {
    let mut offset = E_LFANEW_OFFSET;
    let nt_headers = usize::try_from(read_le_at::<i32>(page, &mut offset).ok()?).ok()?;

    let mut offset = nt_headers.checked_add(PE_SIGNATURE_SIZE)?;
    let machine = read_le_at::<u16>(page, &mut offset).ok()?;

    let optional_header = nt_headers.checked_add(PE_SIGNATURE_SIZE + FILE_HEADER_SIZE)?;
    let mut offset = optional_header;
    let magic = read_le_at::<u16>(page, &mut offset).ok()?;

    let directory = if is_64bit_machine(machine) && magic == PE32_PLUS_MAGIC {
        CLR_DIRECTORY_PE32_PLUS
    } else {
        CLR_DIRECTORY_PE32
    };

    // Each data directory is (rva: u32, size: u32)
    let mut offset = optional_header.checked_add(directory)?.checked_add(4)?;
    read_le_at::<u32>(page, &mut offset).ok()
}

fn is_64bit_machine(machine: u16) -> bool {
    matches!(machine, MACHINE_AMD64 | MACHINE_ARM64 | MACHINE_IA64)
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The host-side program header.
//!
//! Program files may prefix the flat ROM image with an informational
//! header. The assembler never writes one; a wrapping tool does, and hosts
//! accept both headed and bare images.

/// The header identifier.
pub const MAGIC: [u8; 4] = *b"TMBY";

/// Total size of a serialized header.
pub const HEADER_SIZE: usize = 212;

const NAME_LEN: usize = 32;
const AUTHOR_LEN: usize = 32;
const DESCRIPTION_LEN: usize = 128;

/// Header parse errors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HeaderError {
    /// The image is shorter than a header.
    Truncated,
    /// The first four bytes are not `TMBY`.
    BadMagic([u8; 4]),
    /// The declared program size exceeds what follows the header.
    BadProgramSize(u32),
}

impl std::fmt::Display for HeaderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Truncated => write!(f, "file too short for a program header"),
            Self::BadMagic(magic) => write!(f, "bad header identifier {magic:02X?}"),
            Self::BadProgramSize(size) => {
                write!(f, "header declares {size} program bytes but the file has fewer")
            }
        }
    }
}

/// The informational program header.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Header {
    /// Format version triple.
    pub version: (u8, u8, u8),
    /// Size of the ROM image following the header.
    pub program_size: u32,
    /// Work RAM the program asks the host to provide.
    pub wram_size: u32,
    /// Save RAM the program asks the host to provide.
    pub sram_size: u32,
    pub name: String,
    pub author: String,
    pub description: String,
}

impl Header {
    /// Returns true if the file starts with the header identifier.
    pub fn present(file: &[u8]) -> bool {
        file.len() >= 4 && file[..4] == MAGIC
    }

    /// Parses a header off the front of `file` and returns it together
    /// with the ROM image that follows it.
    pub fn parse(file: &[u8]) -> Result<(Self, &[u8]), HeaderError> {
        if file.len() < HEADER_SIZE {
            return Err(HeaderError::Truncated);
        }
        if file[..4] != MAGIC {
            let mut magic = [0; 4];
            magic.copy_from_slice(&file[..4]);
            return Err(HeaderError::BadMagic(magic));
        }

        let version = (file[4], file[5], file[6]);
        let program_size = read_u32(&file[8..12]);
        let wram_size = read_u32(&file[12..16]);
        let sram_size = read_u32(&file[16..20]);

        let name = read_field(&file[20..20 + NAME_LEN]);
        let author = read_field(&file[52..52 + AUTHOR_LEN]);
        let description = read_field(&file[84..84 + DESCRIPTION_LEN]);

        let image = &file[HEADER_SIZE..];
        if program_size as usize > image.len() {
            return Err(HeaderError::BadProgramSize(program_size));
        }

        let header = Self {
            version,
            program_size,
            wram_size,
            sram_size,
            name,
            author,
            description,
        };
        Ok((header, &image[..program_size as usize]))
    }

    /// Serializes the header in front of the given program image.
    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&MAGIC);
        out.push(self.version.0);
        out.push(self.version.1);
        out.push(self.version.2);
        out.push(0);
        out.extend_from_slice(&self.program_size.to_le_bytes());
        out.extend_from_slice(&self.wram_size.to_le_bytes());
        out.extend_from_slice(&self.sram_size.to_le_bytes());
        write_field(out, &self.name, NAME_LEN);
        write_field(out, &self.author, AUTHOR_LEN);
        write_field(out, &self.description, DESCRIPTION_LEN);
    }
}

fn read_u32(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Reads a NUL-padded ASCII field, dropping non-ASCII bytes.
fn read_field(bytes: &[u8]) -> String {
    bytes
        .iter()
        .take_while(|&&b| b != 0)
        .filter(|b| b.is_ascii())
        .map(|&b| b as char)
        .collect()
}

fn write_field(out: &mut Vec<u8>, text: &str, len: usize) {
    let mut field = vec![0; len];
    for (slot, byte) in field.iter_mut().zip(text.bytes().filter(u8::is_ascii)) {
        *slot = byte;
    }
    out.extend_from_slice(&field);
}

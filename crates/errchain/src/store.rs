//! Moving encoded chains through `std::io`.
//!
//! Each record is a little-endian `u64` byte length followed by the output of
//! [`encode`](errchain_core::encode), so several chains can share one stream.

use std::io::{self, Read, Write};

use errchain_core::{Chain, Registry, decode_with, encode_with};
use tracing::debug;

use crate::Result;

/// Records larger than this are rejected before any allocation.
pub const MAX_RECORD_LEN: u64 = 64 * 1024 * 1024;

/// Writes one framed chain using the installed registry.
pub fn write_chain<W: Write + ?Sized>(writer: &mut W, chain: &Chain) -> Result<()> {
    write_chain_with(writer, chain, Registry::global())
}

pub fn write_chain_with<W: Write + ?Sized>(
    writer: &mut W,
    chain: &Chain,
    registry: &Registry,
) -> Result<()> {
    let bytes = encode_with(chain, registry)?;
    writer.write_all(&(bytes.len() as u64).to_le_bytes())?;
    writer.write_all(&bytes)?;
    debug!(len = bytes.len(), nodes = chain.len(), "chain written");
    Ok(())
}

/// Reads one framed chain using the installed registry.
///
/// Returns `Ok(None)` at a clean end of stream.
pub fn read_chain<R: Read + ?Sized>(reader: &mut R) -> Result<Option<Chain>> {
    read_chain_with(reader, Registry::global())
}

pub fn read_chain_with<R: Read + ?Sized>(
    reader: &mut R,
    registry: &Registry,
) -> Result<Option<Chain>> {
    let mut header = [0_u8; 8];
    let mut filled = 0;
    while filled < header.len() {
        match reader.read(&mut header[filled..]) {
            Ok(0) if filled == 0 => return Ok(None),
            Ok(0) => return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into()),
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(err.into()),
        }
    }

    let len = u64::from_le_bytes(header);
    if len > MAX_RECORD_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("record of {len} bytes exceeds {MAX_RECORD_LEN}"),
        )
        .into());
    }

    let mut bytes = vec![0_u8; len as usize];
    reader.read_exact(&mut bytes)?;
    Ok(Some(decode_with(&bytes, registry)?))
}

/// Reads every remaining chain in the stream using the installed registry.
pub fn read_all<R: Read + ?Sized>(reader: &mut R) -> Result<Vec<Chain>> {
    read_all_with(reader, Registry::global())
}

pub fn read_all_with<R: Read + ?Sized>(
    reader: &mut R,
    registry: &Registry,
) -> Result<Vec<Chain>> {
    let mut chains = Vec::new();
    while let Some(chain) = read_chain_with(reader, registry)? {
        chains.push(chain);
    }
    Ok(chains)
}

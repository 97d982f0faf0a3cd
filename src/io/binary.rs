//! Binary network files: an 8-byte magic followed by an rkyv archive of
//! [`NetworkFile`].

use rkyv::rancor;
use rkyv::util::AlignedVec;

use super::NetworkFile;
use crate::{Error, ErrorKind, Result};

pub const MAGIC: &[u8; 8] = b"CNETBIN1";

pub fn encode(file: &NetworkFile) -> Result<Vec<u8>> {
    let archive = rkyv::to_bytes::<rancor::Error>(file)
        .map_err(|e| Error::unknown("Unable to serialise control network", e))?;
    let mut out = Vec::with_capacity(MAGIC.len() + archive.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&archive);
    Ok(out)
}

pub fn decode(bytes: &[u8]) -> Result<NetworkFile> {
    let payload = bytes
        .strip_prefix(MAGIC.as_slice())
        .ok_or_else(|| Error::user("Missing binary control network header"))?;

    // The archive sits after the magic, so it is not aligned in `bytes`.
    let mut aligned = AlignedVec::<16>::with_capacity(payload.len());
    aligned.extend_from_slice(payload);

    rkyv::from_bytes::<NetworkFile, rancor::Error>(&aligned).map_err(|e| {
        Error::unknown("Archive validation failed", e)
            .context(ErrorKind::User, "Corrupt binary control network")
    })
}

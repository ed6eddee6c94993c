//! Encoding of staging units (a whole bucket or a single cell).
//!
//! Units are stored as CBOR. Unlike JSON it keeps non-finite floats, so every value a cell
//! can hold decodes back exactly. Callers must detach cells from their sheet before
//! encoding; implementors of [`crate::CachedCell`] keep the back-reference out of the
//! serialized form.

use serde::de::DeserializeOwned;
use serde::Serialize;

pub(crate) type EncodeError = ciborium::ser::Error<std::io::Error>;
pub(crate) type DecodeError = ciborium::de::Error<std::io::Error>;

pub(crate) fn encode<T: Serialize + ?Sized>(unit: &T) -> Result<Vec<u8>, EncodeError> {
    let mut buf = Vec::new();
    ciborium::into_writer(unit, &mut buf)?;
    Ok(buf)
}

pub(crate) fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, DecodeError> {
    ciborium::from_reader(bytes)
}

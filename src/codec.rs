//! Line-delimited record encoding for values crossing a worker channel.
//!
//! Every task and result travels as one serialized record terminated by a
//! newline. Decoding is deliberately lossy about failure causes: a malformed
//! record, an empty record (the exit sentinel), and end-of-stream all decode
//! to `None`, so a peer that writes garbage is indistinguishable from a peer
//! that hung up.

use serde::de::DeserializeOwned;
use serde::Serialize;

/// The record written to a worker to request that it exit. An empty line
/// decodes to `None`, which the worker loop treats as end-of-stream.
pub(crate) const EXIT_RECORD: &str = "\n";

/// Encodes a value as a single newline-terminated record.
pub(crate) fn encode<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let mut record = serde_json::to_string(value)?;
    record.push('\n');
    Ok(record)
}

/// Decodes one record. Returns `None` for the empty (sentinel) record and for
/// any record that fails to parse.
pub(crate) fn decode<T: DeserializeOwned>(record: &str) -> Option<T> {
    let line = record.trim_end_matches('\n');
    if line.is_empty() {
        return None;
    }
    serde_json::from_str(line).ok()
}

#[cfg(test)]
mod tests {
    use super::{decode, encode, EXIT_RECORD};

    #[test]
    fn test_round_trip() {
        let record = encode(&vec![1u32, 2, 3]).unwrap();
        assert!(record.ends_with('\n'));
        assert_eq!(decode::<Vec<u32>>(&record), Some(vec![1, 2, 3]));
    }

    #[test]
    fn test_exit_record_decodes_to_none() {
        assert_eq!(decode::<u32>(EXIT_RECORD), None);
        assert_eq!(decode::<u32>(""), None);
    }

    #[test]
    fn test_malformed_record_decodes_to_none() {
        assert_eq!(decode::<u32>("not json\n"), None);
        // type mismatch is a decode failure, same as garbage
        assert_eq!(decode::<u32>("\"a string\"\n"), None);
    }
}

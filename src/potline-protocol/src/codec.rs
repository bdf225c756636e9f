// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Line framing for the gateway protocol.

use serde::Serialize;
use tokio::io::AsyncBufRead;
use tokio::io::AsyncBufReadExt;

use crate::types::GatewayEnvelope;

/// Upper bound for a single protocol line, newline included.
pub const MAX_LINE_BYTES: usize = 16 * 1024;

/// Parse one request line.
pub fn parse_envelope(input: &str) -> Result<GatewayEnvelope, serde_json::Error> {
    serde_json::from_str::<GatewayEnvelope>(input.trim_end())
}

/// Serialize a message followed by the line terminator.
pub fn encode_line<T: Serialize>(message: &T) -> Result<String, serde_json::Error> {
    let mut line = serde_json::to_string(message)?;
    line.push('\n');
    Ok(line)
}

/// Read one newline-terminated line of at most `max_bytes`.
///
/// Returns `Ok(None)` on a clean end of stream. A final line without a
/// terminator is returned as-is.
pub async fn read_limited_line<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    max_bytes: usize,
) -> std::io::Result<Option<String>> {
    let mut line = Vec::with_capacity(256);
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            if line.is_empty() {
                return Ok(None);
            }
            return into_text(line).map(Some);
        }

        if let Some(pos) = available.iter().position(|b| *b == b'\n') {
            let chunk = &available[..=pos];
            if line.len() + chunk.len() > max_bytes {
                return Err(too_long(max_bytes));
            }
            line.extend_from_slice(chunk);
            reader.consume(pos + 1);
            return into_text(line).map(Some);
        }

        if line.len() + available.len() > max_bytes {
            return Err(too_long(max_bytes));
        }

        line.extend_from_slice(available);
        let consumed = available.len();
        reader.consume(consumed);
    }
}

fn into_text(line: Vec<u8>) -> std::io::Result<String> {
    String::from_utf8(line).map_err(|e| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("line is not valid UTF-8: {e}"),
        )
    })
}

fn too_long(max_bytes: usize) -> std::io::Error {
    std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        format!("line exceeds maximum size of {max_bytes} bytes"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GatewayRequest, GatewayResponse};

    #[test]
    fn test_parse_read_request() {
        let envelope =
            parse_envelope(r#"{"seq":1,"op":"read","ns":2,"id":"Lijn2_OS_nr_actieve_partij"}"#)
                .unwrap();
        assert_eq!(envelope.seq, 1);
        assert_eq!(
            envelope.request,
            GatewayRequest::Read {
                ns: 2,
                id: "Lijn2_OS_nr_actieve_partij".to_string()
            }
        );
    }

    #[test]
    fn test_parse_unit_request_with_newline() {
        let envelope = parse_envelope("{\"seq\":4,\"op\":\"get_namespace_array\"}\n").unwrap();
        assert_eq!(envelope.request, GatewayRequest::GetNamespaceArray);
    }

    #[test]
    fn test_parse_rejects_unknown_op() {
        assert!(parse_envelope(r#"{"seq":1,"op":"browse"}"#).is_err());
        assert!(parse_envelope("not json").is_err());
    }

    #[test]
    fn test_encode_line_terminates() {
        let line = encode_line(&GatewayResponse::with_value(2, 7)).unwrap();
        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);
    }

    #[tokio::test]
    async fn test_read_limited_line_splits_lines() {
        let mut reader: &[u8] = b"{\"a\":1}\n{\"b\":2}\npartial";
        let first = read_limited_line(&mut reader, MAX_LINE_BYTES).await.unwrap();
        assert_eq!(first.as_deref(), Some("{\"a\":1}\n"));
        let second = read_limited_line(&mut reader, MAX_LINE_BYTES).await.unwrap();
        assert_eq!(second.as_deref(), Some("{\"b\":2}\n"));
        let third = read_limited_line(&mut reader, MAX_LINE_BYTES).await.unwrap();
        assert_eq!(third.as_deref(), Some("partial"));
        let end = read_limited_line(&mut reader, MAX_LINE_BYTES).await.unwrap();
        assert_eq!(end, None);
    }

    #[tokio::test]
    async fn test_read_limited_line_rejects_oversized() {
        let data = vec![b'x'; 64];
        let mut reader: &[u8] = &data;
        let err = read_limited_line(&mut reader, 16).await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }
}

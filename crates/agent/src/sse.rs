//! Server-sent-events framing for streaming model responses.
//!
//! Gemini's `alt=sse` mode sends one JSON object per `data:` line, events
//! separated by a blank line.  [`data_stream`] turns a response body into
//! a stream of those payloads; parsing them is the caller's business.

use crate::util::from_reqwest;
use wc_domain::error::{Error, Result};
use wc_domain::stream::BoxStream;

/// Pull complete `data:` payloads out of an SSE byte buffer.
///
/// Consumed bytes are removed; a trailing partial event stays in the buffer
/// for the next call.  Events are decoded only once complete, so a UTF-8
/// character split across network chunks survives intact.  CRLF line
/// endings are normalized first.
pub(crate) fn drain_data_lines(buffer: &mut Vec<u8>) -> Result<Vec<String>> {
    if buffer.contains(&b'\r') {
        normalize_crlf(buffer);
    }

    let mut payloads = Vec::new();
    while let Some(pos) = buffer.windows(2).position(|w| w == b"\n\n") {
        let block: Vec<u8> = buffer.drain(..pos + 2).collect();
        let block = String::from_utf8(block)
            .map_err(|e| Error::Other(format!("invalid UTF-8 in SSE event: {e}")))?;
        // Multiple data lines in one event are joined with newlines.
        let data: Vec<&str> = block
            .lines()
            .filter_map(|line| line.trim().strip_prefix("data:"))
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .collect();
        if !data.is_empty() {
            payloads.push(data.join("\n"));
        }
    }
    Ok(payloads)
}

/// Rewrite `\r\n` to `\n` in place.  A lone trailing `\r` is kept so its
/// `\n` can pair with it after the next chunk arrives.
fn normalize_crlf(buffer: &mut Vec<u8>) {
    let mut out = Vec::with_capacity(buffer.len());
    let mut i = 0;
    while i < buffer.len() {
        if buffer[i] == b'\r' && buffer.get(i + 1) == Some(&b'\n') {
            i += 1;
            continue;
        }
        out.push(buffer[i]);
        i += 1;
    }
    *buffer = out;
}

/// Stream the `data:` payloads of an SSE response body.  A trailing event
/// without its terminating blank line is still delivered when the body
/// closes.
pub(crate) fn data_stream(response: reqwest::Response) -> BoxStream<'static, Result<String>> {
    let stream = async_stream::stream! {
        let mut response = response;
        let mut buffer: Vec<u8> = Vec::new();

        loop {
            let closed = match response.chunk().await {
                Ok(Some(bytes)) => {
                    buffer.extend_from_slice(&bytes);
                    false
                }
                Ok(None) => {
                    if buffer.iter().all(u8::is_ascii_whitespace) {
                        break;
                    }
                    buffer.extend_from_slice(b"\n\n");
                    true
                }
                Err(e) => {
                    yield Err(from_reqwest(e));
                    break;
                }
            };

            match drain_data_lines(&mut buffer) {
                Ok(payloads) => {
                    for data in payloads {
                        yield Ok(data);
                    }
                }
                Err(e) => {
                    yield Err(e);
                    break;
                }
            }
            if closed {
                break;
            }
        }
    };

    Box::pin(stream)
}

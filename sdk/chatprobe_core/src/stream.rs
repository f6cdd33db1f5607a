//! Decoder for server-sent-event style streaming bodies.
//!
//! Streaming completions arrive as newline-delimited `data: ` records
//! terminated by a `data: [DONE]` sentinel. The decoder reconstructs the
//! JSON chunks in arrival order and drops everything else — keep-alive
//! padding, lines without the event prefix, the sentinel itself, and
//! records whose payload does not parse. A malformed record never aborts
//! the decode, and the sentinel only discards its own line: a record
//! arriving after it is still decoded.
//!
//! The decoder performs no semantic interpretation of chunk contents;
//! accumulating delta text or watching for a finish reason belongs to the
//! calling test.

use crate::client::ApiResponse;
use crate::error::ClientResult;
use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt, TryStreamExt};
use memchr::memchr;

/// Event-record prefix; anything else on a line is not a candidate chunk.
const DATA_PREFIX: &str = "data: ";

/// Payload of the final record on a well-formed stream.
const DONE_SENTINEL: &str = "[DONE]";

/// What the decoder decided to do with one line.
#[derive(Debug, Clone, PartialEq)]
pub enum LineOutcome {
    /// Empty or whitespace-only keep-alive padding; skipped.
    Blank,
    /// No `data: ` prefix; not an event record, silently discarded.
    NotData,
    /// The `[DONE]` sentinel; the record is dropped, the stream goes on.
    Done,
    /// A record whose payload is not valid JSON; silently discarded.
    Malformed,
    /// A parsed chunk, yielded to the caller.
    Chunk(serde_json::Value),
}

/// Classify one line of an event stream.
pub fn classify_line(line: &str) -> LineOutcome {
    if line.trim().is_empty() {
        return LineOutcome::Blank;
    }
    let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
        return LineOutcome::NotData;
    };
    if payload == DONE_SENTINEL {
        return LineOutcome::Done;
    }
    match serde_json::from_str(payload) {
        Ok(value) => LineOutcome::Chunk(value),
        Err(_) => LineOutcome::Malformed,
    }
}

/// Decode a streaming response into its JSON chunks, in arrival order.
///
/// The stream is lazy — each element may suspend on the connection waiting
/// for more bytes — finite, and consumed once. A transport failure
/// mid-stream surfaces as a terminal `Err` element.
pub fn decode(response: ApiResponse) -> impl Stream<Item = ClientResult<serde_json::Value>> {
    decode_bytes(response.into_byte_stream())
}

/// Decode chunks from any byte stream; [`decode`] is this over a response
/// body. Byte-chunk boundaries carry no meaning — a record may arrive split
/// across reads.
pub fn decode_bytes<S>(bytes: S) -> impl Stream<Item = ClientResult<serde_json::Value>>
where
    S: Stream<Item = ClientResult<Bytes>> + Unpin,
{
    futures::stream::try_unfold(LineReader::new(bytes), |mut lines| async move {
        while let Some(line) = lines.next_line().await? {
            match classify_line(&line) {
                LineOutcome::Chunk(value) => return Ok(Some((value, lines))),
                LineOutcome::Blank | LineOutcome::Done => {}
                LineOutcome::NotData | LineOutcome::Malformed => {
                    tracing::debug!(line_len = line.len(), "dropping undecodable stream line");
                }
            }
        }
        Ok(None)
    })
}

/// Decode a streaming response and gather every chunk.
pub async fn collect_chunks(response: ApiResponse) -> ClientResult<Vec<serde_json::Value>> {
    decode(response).try_collect().await
}

/// Splits an incremental byte stream into lines.
struct LineReader<S> {
    stream: S,
    buf: BytesMut,
    eof: bool,
}

impl<S> LineReader<S>
where
    S: Stream<Item = ClientResult<Bytes>> + Unpin,
{
    fn new(stream: S) -> Self {
        Self {
            stream,
            buf: BytesMut::new(),
            eof: false,
        }
    }

    /// Next `\n`-terminated line with the terminator (and a preceding `\r`)
    /// stripped. A trailing unterminated line is yielded at end of stream.
    async fn next_line(&mut self) -> ClientResult<Option<String>> {
        loop {
            if let Some(pos) = memchr(b'\n', &self.buf) {
                let line = self.buf.split_to(pos + 1);
                return Ok(Some(trim_line(&line[..pos])));
            }
            if self.eof {
                if self.buf.is_empty() {
                    return Ok(None);
                }
                let rest = self.buf.split();
                return Ok(Some(trim_line(&rest)));
            }
            match self.stream.next().await {
                Some(Ok(bytes)) => self.buf.extend_from_slice(&bytes),
                Some(Err(err)) => return Err(err),
                None => self.eof = true,
            }
        }
    }
}

fn trim_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ApiClient;
    use futures::stream;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn byte_stream(chunks: Vec<&'static [u8]>) -> impl Stream<Item = ClientResult<Bytes>> + Unpin {
        stream::iter(
            chunks
                .into_iter()
                .map(|chunk| Ok(Bytes::from_static(chunk))),
        )
    }

    async fn decode_all(chunks: Vec<&'static [u8]>) -> Vec<serde_json::Value> {
        decode_bytes(byte_stream(chunks))
            .try_collect()
            .await
            .expect("decode should not fail")
    }

    // --- Line classification ---

    #[test]
    fn empty_and_whitespace_lines_are_blank() {
        assert_eq!(classify_line(""), LineOutcome::Blank);
        assert_eq!(classify_line("   "), LineOutcome::Blank);
        assert_eq!(classify_line("\t"), LineOutcome::Blank);
    }

    #[test]
    fn lines_without_the_prefix_are_not_data() {
        assert_eq!(classify_line("event: ping"), LineOutcome::NotData);
        assert_eq!(classify_line("data:{\"a\":1}"), LineOutcome::NotData);
        assert_eq!(classify_line(": comment"), LineOutcome::NotData);
    }

    #[test]
    fn sentinel_is_recognized_exactly() {
        assert_eq!(classify_line("data: [DONE]"), LineOutcome::Done);
        // Anything that is not the exact sentinel is parsed as a payload.
        assert_eq!(classify_line("data: [DONE] "), LineOutcome::Malformed);
    }

    #[test]
    fn unparseable_payloads_are_malformed() {
        assert_eq!(classify_line("data: not-json"), LineOutcome::Malformed);
        assert_eq!(classify_line("data: {\"a\":"), LineOutcome::Malformed);
    }

    #[test]
    fn valid_payloads_become_chunks() {
        assert_eq!(
            classify_line("data: {\"a\":1}"),
            LineOutcome::Chunk(json!({"a": 1}))
        );
    }

    // --- Decode loop ---

    #[tokio::test]
    async fn round_trip_skips_padding_garbage_and_sentinel() {
        let chunks = decode_all(vec![
            b"data: {\"a\":1}\n\ndata: not-json\ndata: [DONE]\ndata: {\"a\":2}\n",
        ])
        .await;

        // The blank line, the malformed line, and the sentinel are dropped;
        // the record after the sentinel is still decoded.
        assert_eq!(chunks, vec![json!({"a": 1}), json!({"a": 2})]);
    }

    #[tokio::test]
    async fn empty_stream_yields_no_chunks() {
        let chunks = decode_all(vec![]).await;
        assert!(chunks.is_empty());
    }

    #[tokio::test]
    async fn record_split_across_reads_is_reassembled() {
        let chunks = decode_all(vec![b"data: {\"del", b"ta\":\"hi\"}\ndata: [DONE]\n"]).await;
        assert_eq!(chunks, vec![json!({"delta": "hi"})]);
    }

    #[tokio::test]
    async fn crlf_line_endings_are_tolerated() {
        let chunks = decode_all(vec![b"data: {\"a\":1}\r\ndata: {\"a\":2}\r\n"]).await;
        assert_eq!(chunks, vec![json!({"a": 1}), json!({"a": 2})]);
    }

    #[tokio::test]
    async fn unterminated_final_record_is_decoded() {
        let chunks = decode_all(vec![b"data: {\"a\":1}\ndata: {\"a\":2}"]).await;
        assert_eq!(chunks, vec![json!({"a": 1}), json!({"a": 2})]);
    }

    #[tokio::test]
    async fn chunks_preserve_arrival_order() {
        let chunks = decode_all(vec![
            b"data: {\"n\":1}\ndata: {\"n\":2}\ndata: {\"n\":3}\ndata: [DONE]\n",
        ])
        .await;
        let order: Vec<i64> = chunks.iter().map(|c| c["n"].as_i64().unwrap()).collect();
        assert_eq!(order, vec![1, 2, 3]);
    }

    // --- End to end over a response body ---

    #[tokio::test]
    async fn decodes_a_streaming_response_body() {
        let server = MockServer::start().await;

        let body = "data: {\"n\":1}\n\n: keep-alive\n\ndata: {\"n\":2}\n\ndata: [DONE]\n\n";
        Mock::given(method("GET"))
            .and(path("/stream"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(body)
                    .insert_header("content-type", "text/event-stream"),
            )
            .mount(&server)
            .await;

        let client = ApiClient::builder()
            .base_url(server.uri())
            .build()
            .expect("should build");

        let response = client.get("/stream").send().await.expect("should succeed");
        let chunks = collect_chunks(response).await.expect("should decode");

        assert_eq!(chunks, vec![json!({"n": 1}), json!({"n": 2})]);
    }
}

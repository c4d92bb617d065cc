//! Incremental line framing for chunked response bodies

use async_stream::stream;
use futures::{Stream, StreamExt};

/// Split a streamed body into lines as bytes arrive
///
/// Lines are framed on `\n`; a trailing carriage return is stripped. A
/// final unterminated line is still yielded when the body ends. A
/// transport error is yielded in place and ends the stream.
pub(crate) fn lines<S, B, E>(body: S) -> impl Stream<Item = std::result::Result<String, E>>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
{
    stream! {
        let mut body = Box::pin(body);
        let mut buffer: Vec<u8> = Vec::new();

        while let Some(next) = body.next().await {
            match next {
                Ok(bytes) => {
                    buffer.extend_from_slice(bytes.as_ref());
                    while let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
                        let mut line: Vec<u8> = buffer.drain(..=pos).collect();
                        line.pop();
                        if line.last() == Some(&b'\r') {
                            line.pop();
                        }
                        yield Ok(String::from_utf8_lossy(&line).into_owned());
                    }
                }
                Err(err) => {
                    yield Err(err);
                    return;
                }
            }
        }

        if !buffer.is_empty() {
            yield Ok(String::from_utf8_lossy(&buffer).into_owned());
        }
    }
}

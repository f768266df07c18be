//! Response writer for the fake Graph server.
//!
//! Every response carries `Content-Length` and `Connection: close`, so
//! the client never tries to reuse a connection the server is about
//! to drop.

use super::handlers::Response;
use tokio::io::{AsyncWrite, AsyncWriteExt};

const fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        _ => "Error",
    }
}

/// Write `response` as an HTTP/1.1 message and flush.
pub async fn write_response<S: AsyncWrite + Unpin>(
    stream: &mut S,
    response: &Response,
) -> std::io::Result<()> {
    let head = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        response.status,
        reason(response.status),
        response.content_type,
        response.body.len()
    );
    stream.write_all(head.as_bytes()).await?;
    stream.write_all(&response.body).await?;
    stream.flush().await
}

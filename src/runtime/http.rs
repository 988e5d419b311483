use std::path::Path;
use std::pin::Pin;

use hyper::body::{Body, Incoming};
use hyper_util::rt::TokioIo;

use super::{Error, Result};

/// Issues a single `GET` over a fresh HTTP/1 connection on the unix socket at `socket`.
///
/// Returns the response body when the status is 2xx.
///
/// # Errors
///
/// - [`Error::SocketConnect`] if the socket cannot be reached.
/// - [`Error::Request`] / [`Error::Http`] for malformed requests or protocol failures.
/// - [`Error::Status`] for a non-success status, carrying the body for diagnostics.
pub(super) async fn get(socket: &Path, uri: &str) -> Result<Vec<u8>> {
    log::trace!("GET {} via {}", uri, socket.display());
    let stream = tokio::net::UnixStream::connect(socket)
        .await
        .map_err(|source| Error::SocketConnect {
            path: socket.to_path_buf(),
            source,
        })?;

    let (mut sender, connection) =
        hyper::client::conn::http1::handshake::<_, String>(TokioIo::new(stream))
            .await
            .map_err(|source| Error::Http {
                uri: uri.to_owned(),
                source,
            })?;
    tokio::spawn(async move {
        if let Err(err) = connection.await {
            log::debug!("container runtime connection closed with error: {}", err);
        }
    });

    let request = hyper::Request::builder()
        .method(hyper::Method::GET)
        .uri(uri)
        .header(hyper::header::HOST, "localhost")
        .body(String::new())
        .map_err(|source| Error::Request {
            uri: uri.to_owned(),
            source,
        })?;

    let response = sender
        .send_request(request)
        .await
        .map_err(|source| Error::Http {
            uri: uri.to_owned(),
            source,
        })?;
    let status = response.status();
    let body = read_body(response.into_body())
        .await
        .map_err(|source| Error::Http {
            uri: uri.to_owned(),
            source,
        })?;

    if !status.is_success() {
        return Err(Error::Status {
            uri: uri.to_owned(),
            status,
            body: String::from_utf8_lossy(&body).trim().to_owned(),
        });
    }

    Ok(body)
}

async fn read_body(mut body: Incoming) -> std::result::Result<Vec<u8>, hyper::Error> {
    let mut buf = Vec::new();
    while let Some(frame) = std::future::poll_fn(|cx| Pin::new(&mut body).poll_frame(cx)).await {
        if let Ok(chunk) = frame?.into_data() {
            buf.extend_from_slice(&chunk);
        }
    }
    Ok(buf)
}

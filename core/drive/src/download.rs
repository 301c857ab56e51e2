//! Chunked download proxy.
//!
//! The remote body is read in bounded chunks and handed to a
//! [`DownloadSink`] as it arrives, so memory use stays at one chunk
//! regardless of object size.

use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::header;
use std::io;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::io::StreamReader;
use tracing::{debug, error, info, warn};

use drivegate_common::{Error, Result};

use crate::client::ApiClient;

/// Content type announced to the sink regardless of the source type.
pub const ATTACHMENT_CONTENT_TYPE: &str = "application/octet-stream";

/// Headers handed to the sink before the first chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadHeaders {
    /// `attachment; filename="<display name>"`
    pub content_disposition: String,
    /// Advertised total length, if the provider sent one.
    pub content_length: Option<u64>,
    /// Always [`ATTACHMENT_CONTENT_TYPE`].
    pub content_type: String,
    /// Content type the provider reported for the object.
    pub source_content_type: Option<String>,
}

impl DownloadHeaders {
    pub fn attachment(
        display_name: &str,
        content_length: Option<u64>,
        source_content_type: Option<String>,
    ) -> Self {
        let safe_name = display_name.replace(['"', '\\', '\r', '\n'], "_");
        Self {
            content_disposition: format!("attachment; filename=\"{}\"", safe_name),
            content_length,
            content_type: ATTACHMENT_CONTENT_TYPE.to_string(),
            source_content_type,
        }
    }
}

/// Destination of a proxied download.
#[async_trait]
pub trait DownloadSink: Send {
    /// Receive the response headers. Called once, before any chunk.
    async fn start(&mut self, headers: DownloadHeaders) -> Result<()>;

    /// Write one chunk verbatim.
    async fn write_chunk(&mut self, chunk: &[u8]) -> Result<()>;

    /// Called after the last chunk.
    async fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Sink writing chunks to any tokio writer.
pub struct WriterSink<W> {
    writer: W,
    headers: Option<DownloadHeaders>,
}

impl<W> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            headers: None,
        }
    }

    /// Headers received from the proxy, once started.
    pub fn headers(&self) -> Option<&DownloadHeaders> {
        self.headers.as_ref()
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> DownloadSink for WriterSink<W> {
    async fn start(&mut self, headers: DownloadHeaders) -> Result<()> {
        self.headers = Some(headers);
        Ok(())
    }

    async fn write_chunk(&mut self, chunk: &[u8]) -> Result<()> {
        self.writer.write_all(chunk).await?;
        Ok(())
    }

    async fn finish(&mut self) -> Result<()> {
        self.writer.flush().await?;
        Ok(())
    }
}

/// Reads a source in chunks of at most `chunk_size` bytes.
///
/// Every chunk but the last is full. With a known length the reader never
/// reads past it. A read error after a partial fill is held back until the
/// partial chunk has been returned.
pub struct ChunkReader<R> {
    reader: R,
    buffer: Vec<u8>,
    chunk_size: usize,
    remaining: Option<u64>,
    pending_error: Option<io::Error>,
}

impl<R: AsyncRead + Unpin> ChunkReader<R> {
    pub fn new(reader: R, chunk_size: usize, expected_length: Option<u64>) -> Self {
        Self {
            reader,
            buffer: Vec::new(),
            chunk_size: chunk_size.max(1),
            remaining: expected_length,
            pending_error: None,
        }
    }

    /// Next chunk, or `None` once the length is reached or the source ends.
    pub async fn next_chunk(&mut self) -> io::Result<Option<&[u8]>> {
        if let Some(e) = self.pending_error.take() {
            return Err(e);
        }

        let limit = match self.remaining {
            Some(0) => return Ok(None),
            Some(remaining) => remaining.min(self.chunk_size as u64) as usize,
            None => self.chunk_size,
        };

        if self.buffer.len() < limit {
            self.buffer.resize(limit, 0);
        }

        let mut filled = 0;
        while filled < limit {
            match self.reader.read(&mut self.buffer[filled..limit]).await {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if filled == 0 => return Err(e),
                Err(e) => {
                    self.pending_error = Some(e);
                    break;
                }
            }
        }

        if filled == 0 {
            return Ok(None);
        }
        if let Some(remaining) = self.remaining.as_mut() {
            *remaining -= filled as u64;
        }

        Ok(Some(&self.buffer[..filled]))
    }
}

/// Summary of a completed download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadReport {
    pub bytes_written: u64,
    pub chunks_written: u64,
    pub expected_length: Option<u64>,
}

impl DownloadReport {
    /// Whether the source ended before the advertised length.
    pub fn is_short(&self) -> bool {
        self.expected_length
            .is_some_and(|expected| self.bytes_written < expected)
    }
}

/// Proxies object media to a sink in bounded chunks.
pub struct DownloadProxy {
    api: Arc<ApiClient>,
    chunk_size: usize,
}

impl DownloadProxy {
    pub fn new(api: Arc<ApiClient>, chunk_size: usize) -> Self {
        Self { api, chunk_size }
    }

    /// Stream `object_id` to `sink`, announcing it as `display_name`.
    ///
    /// # Errors
    /// - Network errors before the headers arrive
    /// - Non-success media response (nothing reaches the sink)
    /// - Read failure mid-body; the sink has then seen a length that the
    ///   delivered bytes do not match
    /// - Sink errors
    pub async fn stream<S>(
        &self,
        object_id: &str,
        display_name: &str,
        sink: &mut S,
    ) -> Result<DownloadReport>
    where
        S: DownloadSink + ?Sized,
    {
        let token = self.api.access_token().await;
        let url = self.api.files_endpoint(&[object_id])?;
        let request = self.api.http().get(url).query(&[("alt", "media")]);

        // reqwest returns once headers are in; the body stays unread.
        let response = self
            .api
            .send(self.api.authorize(request, &token), "download media")
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Transfer(format!(
                "media request for {} returned {}",
                object_id, status
            )));
        }

        let expected_length = response
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<u64>().ok());
        let source_content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        sink.start(DownloadHeaders::attachment(
            display_name,
            expected_length,
            source_content_type,
        ))
        .await?;

        let body = response.bytes_stream().map_err(io::Error::other);
        let mut chunks = ChunkReader::new(
            StreamReader::new(Box::pin(body)),
            self.chunk_size,
            expected_length,
        );

        let mut report = DownloadReport {
            bytes_written: 0,
            chunks_written: 0,
            expected_length,
        };

        loop {
            let chunk = match chunks.next_chunk().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(e) => {
                    error!(
                        object_id,
                        written = report.bytes_written,
                        ?expected_length,
                        error = %e,
                        "Download aborted mid-transfer"
                    );
                    return Err(Error::Transfer(format!(
                        "read failed after {} bytes: {}",
                        report.bytes_written, e
                    )));
                }
            };

            sink.write_chunk(chunk).await?;
            report.bytes_written += chunk.len() as u64;
            report.chunks_written += 1;
            debug!(object_id, written = report.bytes_written, "Chunk written");
        }

        sink.finish().await?;

        if report.is_short() {
            warn!(
                object_id,
                written = report.bytes_written,
                ?expected_length,
                "Source ended before advertised length"
            );
        } else {
            info!(object_id, bytes = report.bytes_written, "Download complete");
        }

        Ok(report)
    }
}

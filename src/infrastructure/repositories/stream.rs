use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Anything a backend hands back audio through, read to completion.
///
/// SDK byte streams, chunked HTTP bodies, async readers and plain buffers all
/// end up as one contiguous buffer.
#[async_trait]
pub trait DrainToBuffer: Send + Sized {
    async fn drain(self) -> Result<Vec<u8>, String>;
}

#[async_trait]
impl DrainToBuffer for Vec<u8> {
    async fn drain(self) -> Result<Vec<u8>, String> {
        Ok(self)
    }
}

#[async_trait]
impl DrainToBuffer for Bytes {
    async fn drain(self) -> Result<Vec<u8>, String> {
        Ok(self.to_vec())
    }
}

#[async_trait]
impl DrainToBuffer for aws_sdk_polly::primitives::ByteStream {
    async fn drain(self) -> Result<Vec<u8>, String> {
        let aggregated = self
            .collect()
            .await
            .map_err(|e| format!("failed to read audio stream: {}", e))?;
        Ok(aggregated.into_bytes().to_vec())
    }
}

#[async_trait]
impl DrainToBuffer for reqwest::Response {
    async fn drain(self) -> Result<Vec<u8>, String> {
        ByteChunks(Box::pin(self.bytes_stream())).drain().await
    }
}

/// A stream of byte chunks
pub struct ByteChunks<S>(pub S);

#[async_trait]
impl<S, B, E> DrainToBuffer for ByteChunks<S>
where
    S: Stream<Item = Result<B, E>> + Send + Unpin,
    B: AsRef<[u8]> + Send,
    E: std::fmt::Display + Send,
{
    async fn drain(self) -> Result<Vec<u8>, String> {
        let mut stream = self.0;
        let mut buffer = Vec::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| format!("failed to read audio stream: {}", e))?;
            buffer.extend_from_slice(chunk.as_ref());
        }
        Ok(buffer)
    }
}

/// An async reader
pub struct Reader<R>(pub R);

#[async_trait]
impl<R> DrainToBuffer for Reader<R>
where
    R: AsyncRead + Send + Unpin,
{
    async fn drain(self) -> Result<Vec<u8>, String> {
        let mut reader = self.0;
        let mut buffer = Vec::new();
        reader
            .read_to_end(&mut buffer)
            .await
            .map_err(|e| format!("failed to read audio stream: {}", e))?;
        Ok(buffer)
    }
}

//! Output capture for child processes.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::task::JoinHandle;

/// Drains one child stream into a shared buffer on a background task.
///
/// The buffer is shared so that bytes read so far survive when the drain
/// is cut short (e.g. a grandchild still holds the pipe open).
pub(crate) struct Capture {
    buf: Arc<Mutex<Vec<u8>>>,
    task: Option<JoinHandle<()>>,
}

impl Capture {
    pub fn spawn<R>(reader: Option<R>) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let task = reader.map(|mut reader| {
            let buf = buf.clone();
            tokio::spawn(async move {
                let mut chunk = [0u8; 8192];
                loop {
                    match reader.read(&mut chunk).await {
                        Ok(0) => break,
                        Ok(n) => buf.lock().extend_from_slice(&chunk[..n]),
                        Err(e) => {
                            tracing::warn!(
                                error = %e,
                                captured = buf.lock().len(),
                                "pipe read failed; output may be truncated"
                            );
                            break;
                        }
                    }
                }
            })
        });
        Self { buf, task }
    }

    /// Wait up to `grace` for EOF, then return what was captured.
    pub async fn finish(mut self, grace: Duration) -> String {
        if let Some(mut task) = self.task.take() {
            if tokio::time::timeout(grace, &mut task).await.is_err() {
                task.abort();
            }
        }
        let bytes = std::mem::take(&mut *self.buf.lock());
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

/// stdout, then stderr, joined by a newline only when both are non-empty.
pub fn combine_output(stdout: &str, stderr: &str) -> String {
    let mut out = String::with_capacity(stdout.len() + stderr.len() + 1);
    out.push_str(stdout);
    if !stderr.is_empty() {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(stderr);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::ReadBuf;

    struct BrokenPipe;

    impl AsyncRead for BrokenPipe {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe broke")))
        }
    }

    #[test]
    fn combine_table() {
        assert_eq!(combine_output("", ""), "");
        assert_eq!(combine_output("out", ""), "out");
        assert_eq!(combine_output("", "err"), "err");
        assert_eq!(combine_output("out\n", "err\n"), "out\n\nerr\n");
    }

    #[tokio::test]
    async fn capture_reads_to_eof() {
        let capture = Capture::spawn(Some(&b"hello world"[..]));
        assert_eq!(capture.finish(Duration::from_secs(1)).await, "hello world");
    }

    #[tokio::test]
    async fn capture_without_stream_is_empty() {
        let capture = Capture::spawn(None::<&'static [u8]>);
        assert_eq!(capture.finish(Duration::from_millis(10)).await, "");
    }

    #[tokio::test]
    async fn capture_keeps_partial_output_when_cut_short() {
        let (mut writer, reader) = tokio::io::duplex(64);
        tokio::io::AsyncWriteExt::write_all(&mut writer, b"partial")
            .await
            .unwrap();
        // `writer` stays alive, so EOF never arrives.
        let capture = Capture::spawn(Some(reader));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(capture.finish(Duration::from_millis(50)).await, "partial");
        drop(writer);
    }

    #[tokio::test]
    async fn read_error_keeps_bytes_seen_so_far() {
        let reader = (&b"before the break"[..]).chain(BrokenPipe);
        let capture = Capture::spawn(Some(reader));
        assert_eq!(
            capture.finish(Duration::from_secs(1)).await,
            "before the break"
        );
    }
}

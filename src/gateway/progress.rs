use std::io::{Read, Result};

/// Observation hook for upload progress: `(transferred_bytes, total_bytes)`.
pub type ProgressFn = Box<dyn FnMut(u64, u64) + Send>;

/// `Read` adapter that reports cumulative bytes read to a callback.
///
/// Wraps the file handed to the multipart upload so progress reporting stays
/// a pass-through observation with no effect on the transferred bytes.
pub struct ProgressReader<R> {
    inner: R,
    total: u64,
    transferred: u64,
    on_progress: Option<ProgressFn>,
}

impl<R: Read> ProgressReader<R> {
    pub fn new(inner: R, total: u64, on_progress: Option<ProgressFn>) -> Self {
        Self {
            inner,
            total,
            transferred: 0,
            on_progress,
        }
    }
}

impl<R: Read> Read for ProgressReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let n = self.inner.read(buf)?;
        if n > 0 {
            self.transferred += n as u64;
            if let Some(cb) = self.on_progress.as_mut() {
                cb(self.transferred, self.total);
            }
        }
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::ProgressReader;
    use std::io::{Cursor, Read};
    use std::sync::{Arc, Mutex};

    #[test]
    fn reports_cumulative_transferred_bytes() {
        let payload = vec![7u8; 10];
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let mut reader = ProgressReader::new(
            Cursor::new(payload),
            10,
            Some(Box::new(move |transferred, total| {
                sink.lock().expect("lock").push((transferred, total));
            })),
        );

        let mut buf = [0u8; 4];
        let mut out = Vec::new();
        loop {
            let n = reader.read(&mut buf).expect("read");
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }

        assert_eq!(out.len(), 10);
        let calls = seen.lock().expect("lock").clone();
        assert_eq!(calls, vec![(4, 10), (8, 10), (10, 10)]);
    }

    #[test]
    fn works_without_a_callback() {
        let mut reader = ProgressReader::new(Cursor::new(vec![1u8; 3]), 3, None);
        let mut out = Vec::new();
        reader.read_to_end(&mut out).expect("read_to_end");
        assert_eq!(out, vec![1u8; 3]);
    }
}

//! Resumable byte-source abstraction (spec §4.A).
//!
//! A `Payload` is a closed tagged variant, not a trait object: every variant
//! supports `send`, `is_fully_sent`, `total_size`; `append` is only
//! meaningful for the buffered variants and fails loudly on `OnDiskFile`.
//! `send` performs a single best-effort, non-blocking write and reports how
//! much progress was made so the caller can re-invoke it on the next
//! writability event -- short writes are the normal case, never an error.

use crate::prelude::*;

const FILE_CHUNK: usize = 4096;

#[derive(Debug, PartialEq, Eq)]
pub enum SendOutcome {
    /// The fd would block; no bytes were written this call.
    WouldBlock,
    /// `n` bytes were written; more remain.
    Progressed(usize),
    /// Every byte of this payload has now been written.
    Complete,
}

#[derive(Debug)]
pub enum PayloadError {
    /// `append` called on a variant that does not support growth.
    NotAppendable,
    Io(std::io::Error),
}

impl std::fmt::Display for PayloadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PayloadError::NotAppendable => write!(f, "payload variant does not support append"),
            PayloadError::Io(e) => write!(f, "payload io error: {e}"),
        }
    }
}

impl From<std::io::Error> for PayloadError {
    fn from(e: std::io::Error) -> Self {
        PayloadError::Io(e)
    }
}

#[derive(Debug)]
pub enum Payload {
    InMemoryString { bytes: Vec<u8>, sent: usize },
    OnDiskFile {
        path: PathBuf,
        file: Option<File>,
        sent: usize,
        total: usize,
    },
    CgiBuffer {
        bytes: Vec<u8>,
        sent: usize,
        headers_end: Option<usize>,
        status: u16,
        headers: Vec<(String, String)>,
    },
}

impl Payload {
    pub fn in_memory(bytes: Vec<u8>) -> Self {
        Payload::InMemoryString { bytes, sent: 0 }
    }

    pub fn on_disk_file(path: PathBuf) -> std::io::Result<Self> {
        let file = File::open(&path)?;
        let total = file.metadata()?.size() as usize;
        Ok(Payload::OnDiskFile {
            path,
            file: Some(file),
            sent: 0,
            total,
        })
    }

    pub fn cgi_buffer() -> Self {
        Payload::CgiBuffer {
            bytes: Vec::new(),
            sent: 0,
            headers_end: None,
            status: 200,
            headers: Vec::new(),
        }
    }

    pub fn total_size(&self) -> usize {
        match self {
            Payload::InMemoryString { bytes, .. } => bytes.len(),
            Payload::OnDiskFile { total, .. } => *total,
            Payload::CgiBuffer { bytes, .. } => bytes.len(),
        }
    }

    pub fn bytes_sent(&self) -> usize {
        match self {
            Payload::InMemoryString { sent, .. } => *sent,
            Payload::OnDiskFile { sent, .. } => *sent,
            Payload::CgiBuffer { sent, .. } => *sent,
        }
    }

    pub fn is_fully_sent(&self) -> bool {
        self.bytes_sent() == self.total_size()
    }

    /// `CgiBuffer` only: parsed status/header fields once the `\r\n\r\n`
    /// terminator has appeared in the accumulated bytes.
    pub fn cgi_headers(&self) -> Option<(u16, &[(String, String)])> {
        match self {
            Payload::CgiBuffer {
                headers_end: Some(_),
                status,
                headers,
                ..
            } => Some((*status, headers.as_slice())),
            _ => None,
        }
    }

    /// Append bytes to a growable variant. `OnDiskFile` rejects this loudly,
    /// matching the spec's "append is invalid on OnDiskFile" invariant.
    pub fn append(&mut self, data: &[u8]) -> Result<(), PayloadError> {
        match self {
            Payload::InMemoryString { bytes, .. } => {
                bytes.extend_from_slice(data);
                Ok(())
            }
            Payload::CgiBuffer {
                bytes,
                headers_end,
                status,
                headers,
                ..
            } => {
                bytes.extend_from_slice(data);
                if headers_end.is_none() {
                    if let Some(pos) = find_subsequence(bytes, b"\r\n\r\n", 0) {
                        let (code, parsed) = crate::cgi::parse_cgi_headers(&bytes[..pos]);
                        *status = code;
                        *headers = parsed;
                        *headers_end = Some(pos);
                    }
                }
                Ok(())
            }
            Payload::OnDiskFile { .. } => Err(PayloadError::NotAppendable),
        }
    }

    /// Perform one best-effort, non-blocking write of the remaining bytes.
    pub fn send(&mut self, fd: &mut impl Write) -> Result<SendOutcome, PayloadError> {
        if self.is_fully_sent() {
            return Ok(SendOutcome::Complete);
        }
        match self {
            Payload::InMemoryString { bytes, sent } => {
                Self::send_slice(fd, bytes, sent)
            }
            Payload::CgiBuffer { bytes, sent, .. } => Self::send_slice(fd, bytes, sent),
            Payload::OnDiskFile {
                file, sent, total, ..
            } => {
                let Some(f) = file.as_mut() else {
                    return Ok(SendOutcome::Complete);
                };
                let remaining = *total - *sent;
                let want = remaining.min(FILE_CHUNK);
                let mut chunk = vec![0u8; want];
                f.seek(std::io::SeekFrom::Start(*sent as u64))?;
                let read = f.read(&mut chunk)?;
                if read == 0 {
                    // file shrank under us; treat as complete to avoid spinning
                    *sent = *total;
                    *file = None;
                    return Ok(SendOutcome::Complete);
                }
                match fd.write(&chunk[..read]) {
                    Ok(0) => Ok(SendOutcome::WouldBlock),
                    Ok(n) => {
                        *sent += n;
                        if *sent >= *total {
                            *file = None;
                            Ok(SendOutcome::Complete)
                        } else {
                            Ok(SendOutcome::Progressed(n))
                        }
                    }
                    Err(e) if e.kind() == ErrorKind::WouldBlock => Ok(SendOutcome::WouldBlock),
                    Err(e) => Err(PayloadError::Io(e)),
                }
            }
        }
    }

    fn send_slice(
        fd: &mut impl Write,
        bytes: &[u8],
        sent: &mut usize,
    ) -> Result<SendOutcome, PayloadError> {
        let remaining = &bytes[*sent..];
        match fd.write(remaining) {
            Ok(0) => Ok(SendOutcome::WouldBlock),
            Ok(n) => {
                *sent += n;
                if *sent >= bytes.len() {
                    Ok(SendOutcome::Complete)
                } else {
                    Ok(SendOutcome::Progressed(n))
                }
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => Ok(SendOutcome::WouldBlock),
            Err(e) => Err(PayloadError::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    /// A fd stand-in that blocks after `cap` bytes per call, for exercising
    /// the "wrote nothing / wrote some / fully sent" trichotomy (property 6).
    struct FlakyWriter {
        sink: Vec<u8>,
        cap: usize,
        blocked: bool,
    }

    impl Write for FlakyWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.blocked {
                return Err(io::Error::new(io::ErrorKind::WouldBlock, "blocked"));
            }
            let n = buf.len().min(self.cap);
            self.sink.extend_from_slice(&buf[..n]);
            Ok(n)
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn in_memory_progress_is_monotonic() {
        let mut payload = Payload::in_memory(b"hello world".to_vec());
        let mut w = FlakyWriter { sink: Vec::new(), cap: 4, blocked: false };

        assert!(!payload.is_fully_sent());
        let mut total_sent = 0;
        loop {
            match payload.send(&mut w).unwrap() {
                SendOutcome::Complete => break,
                SendOutcome::Progressed(n) => {
                    assert!(n > 0);
                    total_sent += n;
                    assert_eq!(payload.bytes_sent(), total_sent);
                }
                SendOutcome::WouldBlock => panic!("writer never blocks in this test"),
            }
        }
        assert!(payload.is_fully_sent());
        assert_eq!(w.sink, b"hello world");
    }

    #[test]
    fn blocked_fd_never_advances_bytes_sent() {
        let mut payload = Payload::in_memory(b"data".to_vec());
        let mut w = FlakyWriter { sink: Vec::new(), cap: 4, blocked: true };
        for _ in 0..5 {
            let outcome = payload.send(&mut w).unwrap();
            assert_eq!(outcome, SendOutcome::WouldBlock);
            assert_eq!(payload.bytes_sent(), 0);
        }
    }

    #[test]
    fn cgi_buffer_parses_headers_once_terminator_seen() {
        let mut payload = Payload::cgi_buffer();
        payload.append(b"Content-Type: text/plain\r\n").unwrap();
        assert!(payload.cgi_headers().is_none());
        payload.append(b"\r\nok").unwrap();
        let (status, headers) = payload.cgi_headers().expect("headers parsed");
        assert_eq!(status, 200);
        assert!(headers.iter().any(|(k, v)| k == "content-type" && v == "text/plain"));
    }

    #[test]
    fn on_disk_file_rejects_append() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("payload_test_{}.txt", std::process::id()));
        std::fs::write(&path, b"abc").unwrap();
        let mut payload = Payload::on_disk_file(path.clone()).unwrap();
        assert_eq!(payload.total_size(), 3);
        assert!(matches!(payload.append(b"x"), Err(PayloadError::NotAppendable)));
        let _ = std::fs::remove_file(path);
    }
}

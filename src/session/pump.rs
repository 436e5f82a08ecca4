//! Background reader that moves PTY output onto a channel

use crate::engine::OutputStream;
use bytes::Bytes;
use log::trace;
use rustix::io::Errno;
use std::io::{self, Read};
use std::thread;
use tokio::sync::mpsc::unbounded_channel;

const READ_CHUNK_SIZE: usize = 4096;

/// Spawn a thread that reads `reader` until EOF and forwards every chunk.
///
/// The channel closes at EOF. A read error is forwarded once and also closes
/// the channel. The thread exits early when the receiver is dropped, on its
/// next successful read.
pub(crate) fn spawn_pump<R: Read + Send + 'static>(mut reader: R) -> io::Result<OutputStream> {
    let (tx, rx) = unbounded_channel();

    thread::Builder::new()
        .name("ptyexpect-pump".to_string())
        .spawn(move || {
            let mut buf = [0u8; READ_CHUNK_SIZE];
            loop {
                match reader.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        if tx.send(Ok(Bytes::copy_from_slice(&buf[..n]))).is_err() {
                            break; // Receiver dropped
                        }
                    }
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    // EIO on a PTY master: every slave descriptor is closed
                    Err(e) if e.raw_os_error() == Some(Errno::IO.raw_os_error()) => break,
                    Err(e) => {
                        let _ = tx.send(Err(e));
                        break;
                    }
                }
            }
            trace!("output pump finished");
        })?;

    Ok(rx)
}

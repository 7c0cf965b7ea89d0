//! Stream access to a virtual file's buffer.
//!
//! Every open stream holds the node's open-handle count for its lifetime;
//! deletion of the node fails with `InUse` until the stream is dropped.
//! Read streams each own their own cursor, so two concurrent readers are
//! independent.

use std::cell::{Cell, RefCell};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::rc::Rc;

use crate::tree::FileData;

/// How a file stream may be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamMode {
    /// Seekable, reads only.
    Read,
    /// Truncates the buffer at open, positioned at the start, no reads.
    Write,
    /// Write-only, positioned at the end; seeking backward is an error.
    Append,
    /// Read + write + seek, content preserved at open.
    Modify,
}

/// RAII open-handle on a file node.
#[derive(Debug)]
struct OpenGuard {
    handles: Rc<Cell<usize>>,
}

impl OpenGuard {
    fn acquire(handles: &Rc<Cell<usize>>) -> Self {
        handles.set(handles.get() + 1);
        Self {
            handles: Rc::clone(handles),
        }
    }
}

impl Drop for OpenGuard {
    fn drop(&mut self) {
        self.handles.set(self.handles.get().saturating_sub(1));
    }
}

/// A cursor over a virtual file's byte buffer, behaving per its
/// [`StreamMode`]. Obtained from the `MemoryFs` open methods.
#[derive(Debug)]
pub struct FileStream {
    content: Rc<RefCell<Vec<u8>>>,
    _guard: OpenGuard,
    mode: StreamMode,
    pos: u64,
    /// Buffer length at open time; an append stream may never seek below it.
    append_floor: u64,
}

impl FileStream {
    pub(crate) fn open(data: &FileData, mode: StreamMode) -> Self {
        let guard = OpenGuard::acquire(&data.open_handles);
        if mode == StreamMode::Write {
            data.content.borrow_mut().clear();
        }
        let len = data.content.borrow().len() as u64;
        let pos = if mode == StreamMode::Append { len } else { 0 };
        Self {
            content: Rc::clone(&data.content),
            _guard: guard,
            mode,
            pos,
            append_floor: len,
        }
    }

    pub fn mode(&self) -> StreamMode {
        self.mode
    }

    /// Length of the underlying buffer right now.
    pub fn len(&self) -> u64 {
        self.content.borrow().len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.content.borrow().is_empty()
    }

    fn not_supported(&self, operation: &str) -> io::Error {
        io::Error::new(
            io::ErrorKind::PermissionDenied,
            format!("stream opened in {:?} mode does not support {operation}", self.mode),
        )
    }
}

impl Read for FileStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if !matches!(self.mode, StreamMode::Read | StreamMode::Modify) {
            return Err(self.not_supported("reading"));
        }
        let content = self.content.borrow();
        let start = (self.pos as usize).min(content.len());
        let n = buf.len().min(content.len() - start);
        buf[..n].copy_from_slice(&content[start..start + n]);
        self.pos += n as u64;
        Ok(n)
    }
}

impl Write for FileStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.mode {
            StreamMode::Read => Err(self.not_supported("writing")),
            StreamMode::Append => {
                let mut content = self.content.borrow_mut();
                content.extend_from_slice(buf);
                self.pos = content.len() as u64;
                Ok(buf.len())
            }
            StreamMode::Write | StreamMode::Modify => {
                let mut content = self.content.borrow_mut();
                let start = self.pos as usize;
                if start > content.len() {
                    // Writing past the end zero-fills the gap.
                    content.resize(start, 0);
                }
                let overlap = buf.len().min(content.len().saturating_sub(start));
                content[start..start + overlap].copy_from_slice(&buf[..overlap]);
                content.extend_from_slice(&buf[overlap..]);
                self.pos += buf.len() as u64;
                Ok(buf.len())
            }
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for FileStream {
    fn seek(&mut self, target: SeekFrom) -> io::Result<u64> {
        let absolute = match target {
            SeekFrom::Start(n) => n,
            SeekFrom::Current(delta) => offset_by(self.pos, delta)?,
            SeekFrom::End(delta) => offset_by(self.len(), delta)?,
        };
        if self.mode == StreamMode::Append && absolute < self.append_floor {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "append stream cannot seek backward",
            ));
        }
        self.pos = absolute;
        Ok(self.pos)
    }
}

/// Apply a signed seek delta to an unsigned position without wrapping.
fn offset_by(base: u64, delta: i64) -> io::Result<u64> {
    let shifted = if delta >= 0 {
        base.checked_add(delta as u64)
    } else {
        base.checked_sub(delta.unsigned_abs())
    };
    shifted.ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            if delta < 0 {
                "seek before the start of the stream"
            } else {
                "seek position overflows"
            },
        )
    })
}

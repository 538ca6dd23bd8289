//! Virtual file bridge between the external importer and a [`FileProvider`].
//!
//! The importer never touches the filesystem itself. Every file it asks for
//! is fetched whole from the provider and handed out as a [`MemoryFile`], an
//! in-memory view with read/seek/size operations. Dropping a `MemoryFile`
//! closes it; the bridge keeps count so the import scope can check that
//! everything was released.

use std::{
    cell::Cell,
    collections::HashMap,
    io::{self, Read, Seek, SeekFrom},
    path::{Path, PathBuf},
    rc::Rc,
};

/// Supplies the raw bytes of an asset or one of its sub-resources by name.
pub trait FileProvider {
    fn get_file(&self, name: &str) -> io::Result<Vec<u8>>;
}

impl<F> FileProvider for F
where
    F: Fn(&str) -> io::Result<Vec<u8>>,
{
    fn get_file(&self, name: &str) -> io::Result<Vec<u8>> {
        self(name)
    }
}

impl FileProvider for HashMap<String, Vec<u8>> {
    fn get_file(&self, name: &str) -> io::Result<Vec<u8>> {
        self.get(name).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("no file named '{}'", name))
        })
    }
}

/// Reads files relative to a root directory.
#[derive(Debug, Clone)]
pub struct DirectoryProvider {
    root: PathBuf,
}

impl DirectoryProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl FileProvider for DirectoryProvider {
    fn get_file(&self, name: &str) -> io::Result<Vec<u8>> {
        std::fs::read(self.root.join(name))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Set,
    Cur,
    End,
}

#[derive(Debug)]
struct OpenGuard(Rc<Cell<usize>>);

impl Drop for OpenGuard {
    fn drop(&mut self) {
        self.0.set(self.0.get().saturating_sub(1));
    }
}

/// A file handed to the importer. The cursor always stays within `[0, size]`.
#[derive(Debug)]
pub struct MemoryFile {
    name: String,
    data: Vec<u8>,
    position: usize,
    _open: OpenGuard,
}

impl MemoryFile {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn tell(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> &[u8] {
        &self.data[self.position..]
    }

    /// Copies up to `count` elements of `size` bytes into `buf` and returns
    /// how many whole elements were copied. Partial elements are never read.
    pub fn read_elements(&mut self, buf: &mut [u8], size: usize, count: usize) -> usize {
        if size == 0 {
            return 0;
        }
        let max = (self.remaining().len() / size)
            .min(count)
            .min(buf.len() / size);
        let bytes = max * size;
        buf[..bytes].copy_from_slice(&self.data[self.position..self.position + bytes]);
        self.position += bytes;
        max
    }

    pub fn seek_to(&mut self, offset: i64, origin: Origin) -> usize {
        let base = match origin {
            Origin::Set => 0,
            Origin::Cur => self.position as i64,
            Origin::End => self.data.len() as i64,
        };
        self.position = (base + offset).clamp(0, self.data.len() as i64) as usize;
        self.position
    }

    /// Reads everything from the cursor to the end.
    pub fn read_remaining(&mut self) -> Vec<u8> {
        let bytes = self.remaining().to_vec();
        self.position = self.data.len();
        bytes
    }

    pub fn close(self) {}
}

impl Read for MemoryFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.read_elements(buf, 1, buf.len()))
    }
}

impl Seek for MemoryFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let (offset, origin) = match pos {
            SeekFrom::Start(offset) => (offset as i64, Origin::Set),
            SeekFrom::Current(offset) => (offset, Origin::Cur),
            SeekFrom::End(offset) => (offset, Origin::End),
        };
        Ok(self.seek_to(offset, origin) as u64)
    }
}

/// Opens provider-backed files for the importer.
pub struct FileBridge<'p> {
    provider: &'p dyn FileProvider,
    open: Rc<Cell<usize>>,
}

impl<'p> FileBridge<'p> {
    pub fn new(provider: &'p dyn FileProvider) -> Self {
        Self {
            provider,
            open: Rc::new(Cell::new(0)),
        }
    }

    pub fn open(&self, name: &str) -> io::Result<MemoryFile> {
        let data = self.provider.get_file(name)?;
        self.open.set(self.open.get() + 1);
        log::trace!("opened '{}' ({} bytes)", name, data.len());
        Ok(MemoryFile {
            name: name.to_string(),
            data,
            position: 0,
            _open: OpenGuard(self.open.clone()),
        })
    }

    /// Number of files handed out and not yet closed.
    pub fn open_files(&self) -> usize {
        self.open.get()
    }
}

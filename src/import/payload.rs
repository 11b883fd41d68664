//! Random-access payload sources and compression sniffing

use bzip2::read::MultiBzDecoder;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Cursor, Read, Seek};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Magic bytes at the start of every bzip2 stream
const BZIP2_MAGIC: &[u8] = b"BZh";

/// A payload that can hand out independent seekable readers
///
/// Each segment worker opens its own reader, so the source must be
/// shareable across threads.
pub trait SeekableSource: Send + Sync + 'static {
    type Reader: Read + Seek + Send + 'static;

    /// Open a fresh reader positioned at the start of the payload
    fn open_reader(&self) -> io::Result<Self::Reader>;

    /// Human-readable name for logs and errors
    fn describe(&self) -> String;
}

/// Payload stored in a file on disk
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    /// Create a source, checking that the file can be opened
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        File::open(&path)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SeekableSource for FileSource {
    type Reader = File;

    fn open_reader(&self) -> io::Result<File> {
        File::open(&self.path)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Payload held in memory
#[derive(Debug, Clone)]
pub struct MemorySource {
    data: Arc<[u8]>,
}

impl MemorySource {
    pub fn new(data: impl Into<Arc<[u8]>>) -> Self {
        Self { data: data.into() }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl From<Vec<u8>> for MemorySource {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

impl SeekableSource for MemorySource {
    type Reader = Cursor<Arc<[u8]>>;

    fn open_reader(&self) -> io::Result<Self::Reader> {
        Ok(Cursor::new(Arc::clone(&self.data)))
    }

    fn describe(&self) -> String {
        format!("<memory: {} bytes>", self.data.len())
    }
}

/// Wrap `reader` in a buffered reader, decompressing it if it starts with bzip2 magic
///
/// All concatenated bzip2 streams are decoded, so this works for both the
/// single-stream and multistream layouts when read front to back.
pub fn open_text<R>(reader: R, capacity: usize) -> io::Result<Box<dyn BufRead + Send>>
where
    R: Read + Send + 'static,
{
    let mut buffered = BufReader::with_capacity(capacity, reader);
    let is_bz2 = buffered.fill_buf()?.starts_with(BZIP2_MAGIC);

    if is_bz2 {
        tracing::debug!("Detected bzip2 compression");
        Ok(Box::new(BufReader::with_capacity(
            capacity,
            MultiBzDecoder::new(buffered),
        )))
    } else {
        Ok(Box::new(buffered))
    }
}

/// Open a file as text, decompressing bzip2 transparently
pub fn open_text_file(path: impl AsRef<Path>, capacity: usize) -> io::Result<Box<dyn BufRead + Send>> {
    open_text(File::open(path)?, capacity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bzip2::write::BzEncoder;
    use bzip2::Compression;
    use std::io::{SeekFrom, Write};

    fn compress(data: &[u8]) -> Vec<u8> {
        let mut encoder = BzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_plain_text_passes_through() {
        let mut reader = open_text(Cursor::new(b"499:10:Plain\n".to_vec()), 4096).unwrap();
        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        assert_eq!(line, "499:10:Plain\n");
    }

    #[test]
    fn test_concatenated_bzip2_streams_are_decoded() {
        let mut data = compress(b"first\n");
        data.extend(compress(b"second\n"));

        let mut reader = open_text(Cursor::new(data), 4096).unwrap();
        let mut text = String::new();
        reader.read_to_string(&mut text).unwrap();
        assert_eq!(text, "first\nsecond\n");
    }

    #[test]
    fn test_memory_source_readers_are_independent() {
        let source = MemorySource::from(b"0123456789".to_vec());
        let mut a = source.open_reader().unwrap();
        let mut b = source.open_reader().unwrap();

        a.seek(SeekFrom::Start(5)).unwrap();
        let mut buf = [0u8; 2];
        a.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"56");
        b.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"01");
        assert_eq!(source.len(), 10);
    }

    #[test]
    fn test_file_source_requires_existing_file() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(FileSource::open(tmp.path().join("missing.xml.bz2")).is_err());

        let path = tmp.path().join("dump.xml");
        std::fs::write(&path, b"<mediawiki/>").unwrap();
        let source = FileSource::open(&path).unwrap();
        assert!(source.describe().ends_with("dump.xml"));
    }
}

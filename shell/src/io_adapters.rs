use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Result as IoResult, Write};

/// Input stream of a call: either the one it received from its caller, or a
/// file it opened itself through a `<` redirection.
///
/// Dropping an owned stream closes the file.
pub enum InputStream<'a> {
    Inherited(&'a mut dyn Read),
    Owned(BufReader<File>),
}

impl InputStream<'_> {
    pub fn is_owned(&self) -> bool {
        matches!(self, InputStream::Owned(_))
    }
}

impl Read for InputStream<'_> {
    fn read(&mut self, buf: &mut [u8]) -> IoResult<usize> {
        match self {
            InputStream::Inherited(reader) => reader.read(buf),
            InputStream::Owned(reader) => reader.read(buf),
        }
    }
}

/// Output stream of a call: inherited, or a file opened through `>`.
pub enum OutputStream<'a> {
    Inherited(&'a mut dyn Write),
    Owned(BufWriter<File>),
}

impl OutputStream<'_> {
    pub fn is_owned(&self) -> bool {
        matches!(self, OutputStream::Owned(_))
    }

    /// Flushes buffered output and releases an owned file.
    ///
    /// Inherited streams are flushed too but stay open for the caller.
    pub fn close(mut self) -> IoResult<()> {
        self.flush()
    }
}

impl Write for OutputStream<'_> {
    fn write(&mut self, buf: &[u8]) -> IoResult<usize> {
        match self {
            OutputStream::Inherited(writer) => writer.write(buf),
            OutputStream::Owned(writer) => writer.write(buf),
        }
    }

    fn flush(&mut self) -> IoResult<()> {
        match self {
            OutputStream::Inherited(writer) => writer.flush(),
            OutputStream::Owned(writer) => writer.flush(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn inherited_streams_pass_through() {
        let mut source: &[u8] = b"abc";
        let mut input = InputStream::Inherited(&mut source);
        let mut buf = String::new();
        input.read_to_string(&mut buf).unwrap();
        assert_eq!(buf, "abc");
        assert!(!input.is_owned());

        let mut sink = Vec::new();
        let mut output = OutputStream::Inherited(&mut sink);
        output.write_all(b"xyz").unwrap();
        output.close().unwrap();
        assert_eq!(sink, b"xyz");
    }

    #[test]
    fn owned_output_is_flushed_on_close() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let mut output = OutputStream::Owned(BufWriter::new(File::create(&path).unwrap()));
        assert!(output.is_owned());
        output.write_all(b"hello\n").unwrap();
        output.close().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello\n");
    }
}

use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom};

/// Line reader over a seekable byte stream that knows where it is.
///
/// Lines come back with their `\n` terminator (if any). Only whole lines are
/// returned: a line ends at `\n` or at end of input, never in between, so
/// [`LineSource::offset`] is always a valid place to resume from.
pub struct LineSource<R> {
    reader: BufReader<R>,
    position: u64,
}

impl<R: Read + Seek> LineSource<R> {
    pub fn new(inner: R) -> Self {
        Self {
            reader: BufReader::new(inner),
            position: 0,
        }
    }

    /// Restart reading at `offset`.
    pub fn seek(&mut self, offset: u64) -> io::Result<()> {
        self.reader.seek(SeekFrom::Start(offset))?;
        self.position = offset;
        Ok(())
    }

    /// Byte offset just past the last line returned.
    pub fn offset(&self) -> u64 {
        self.position
    }

    pub fn next_line(&mut self) -> io::Result<Option<Vec<u8>>> {
        let mut line = Vec::new();
        let read = self.reader.read_until(b'\n', &mut line)?;
        if read == 0 {
            return Ok(None);
        }
        self.position += read as u64;
        Ok(Some(line))
    }
}

impl<R: Read + Seek> Iterator for LineSource<R> {
    type Item = io::Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_line().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_lines_and_positions() {
        let mut source = LineSource::new(Cursor::new(b"ab\ncde\r\nf".to_vec()));

        assert_eq!(source.next_line().unwrap().unwrap(), b"ab\n");
        assert_eq!(source.offset(), 3);
        assert_eq!(source.next_line().unwrap().unwrap(), b"cde\r\n");
        assert_eq!(source.offset(), 8);
        assert_eq!(source.next_line().unwrap().unwrap(), b"f");
        assert_eq!(source.offset(), 9);
        assert!(source.next_line().unwrap().is_none());
        assert_eq!(source.offset(), 9);
    }

    #[test]
    fn test_restart_from_offset() {
        let mut source = LineSource::new(Cursor::new(b"one\ntwo\nthree\n".to_vec()));
        source.next_line().unwrap();
        let resume = source.offset();
        source.next_line().unwrap();

        source.seek(resume).unwrap();
        assert_eq!(source.next_line().unwrap().unwrap(), b"two\n");
    }

    #[test]
    fn test_iterator_collects_all_lines() {
        let source = LineSource::new(Cursor::new(b"a\nb\n".to_vec()));
        let lines: Vec<Vec<u8>> = source.collect::<Result<_, _>>().unwrap();
        assert_eq!(lines, vec![b"a\n".to_vec(), b"b\n".to_vec()]);
    }

    /// Reads one line through a mutable borrow and reports where it ended.
    fn advance<R: Read + Seek>(source: &mut LineSource<R>) -> u64 {
        source.next_line().unwrap();
        source.offset()
    }

    #[test]
    fn test_offset_through_mutable_borrow() {
        let mut source = LineSource::new(Cursor::new(b"id,name\n1,a\n".to_vec()));
        assert_eq!(advance(&mut source), 8);
        assert_eq!(advance(&mut source), 12);

        // Iterator::position stays available and distinct
        let mut rest = LineSource::new(Cursor::new(b"x\ny\n".to_vec()));
        assert_eq!(rest.position(|line| line.unwrap() == b"y\n"), Some(1));
    }

    #[test]
    fn test_io_error_surfaces() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::Other, "disk gone"))
            }
        }
        impl Seek for Broken {
            fn seek(&mut self, _: SeekFrom) -> io::Result<u64> {
                Ok(0)
            }
        }

        let mut source = LineSource::new(Broken);
        let err = source.next_line().unwrap_err();
        assert_eq!(err.to_string(), "disk gone");
    }
}

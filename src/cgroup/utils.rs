use std::io::{BufRead, BufReader, Seek, SeekFrom};

/// Applies `reader` to `file` and rewinds it for the next read.
///
/// The file is rewound even if `reader` fails. Returns `Ok(None)` if the file
/// is `None`.
pub fn read_and_rewind<T, R>(
    file: Option<&mut R>,
    reader: impl FnOnce(&mut R) -> std::io::Result<T>,
) -> std::io::Result<Option<T>>
where
    R: BufRead + Seek,
{
    let Some(f) = file else {
        return Ok(None);
    };
    let result = reader(f);
    f.seek(SeekFrom::Start(0))?;
    result.map(Some)
}

/// Opens `path` for buffered reading; a missing or unreadable file yields `None`.
#[inline]
pub fn open_file(path: impl AsRef<std::path::Path>) -> Option<BufReader<std::fs::File>> {
    Some(BufReader::new(std::fs::File::open(path).ok()?))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn test_read_and_rewind_reads_twice() {
        let mut cursor = Cursor::new(b"42\n".to_vec());
        let read = |c: &mut Cursor<Vec<u8>>| -> std::io::Result<String> {
            let mut line = String::new();
            c.read_line(&mut line)?;
            Ok(line.trim().to_owned())
        };

        let first = read_and_rewind(Some(&mut cursor), read).unwrap();
        let second = read_and_rewind(Some(&mut cursor), read).unwrap();
        assert_eq!(first.as_deref(), Some("42"));
        assert_eq!(first, second);
    }

    #[test]
    fn test_read_and_rewind_after_failed_read() {
        let mut cursor = Cursor::new(b"42\n".to_vec());
        let fail = |c: &mut Cursor<Vec<u8>>| -> std::io::Result<()> {
            let mut line = String::new();
            c.read_line(&mut line)?;
            Err(std::io::Error::other("parse failed"))
        };

        assert!(read_and_rewind(Some(&mut cursor), fail).is_err());
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn test_read_and_rewind_missing_file() {
        let result = read_and_rewind(None::<&mut Cursor<Vec<u8>>>, |_| Ok(1)).unwrap();
        assert_eq!(result, None);
    }

    #[test]
    fn test_open_missing_file() {
        assert!(open_file("/definitely/does/not/exist").is_none());
    }
}

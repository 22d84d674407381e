//! Content type detection from the leading bytes of an upload.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt};

/// How many leading bytes are inspected.
pub const SNIFF_LEN: usize = 3072;

pub const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Guess the MIME type of `head`, the first bytes of some content.
pub fn detect(head: &[u8]) -> &'static str {
    if let Some(kind) = infer::get(head) {
        return kind.mime_type();
    }
    if is_text(head) {
        TEXT_PLAIN
    } else {
        OCTET_STREAM
    }
}

fn is_text(head: &[u8]) -> bool {
    if head.contains(&0) {
        return false;
    }
    match std::str::from_utf8(head) {
        Ok(_) => true,
        // a multi-byte character cut off by the sniff window
        Err(e) => e.error_len().is_none(),
    }
}

/// Read up to [`SNIFF_LEN`] bytes from `reader`, detect the type and seek
/// back to the start so nothing is consumed.
pub async fn sniff<R>(reader: &mut R) -> io::Result<&'static str>
where
    R: AsyncRead + AsyncSeek + Unpin,
{
    let mut head = vec![0u8; SNIFF_LEN];
    let mut filled = 0;
    while filled < SNIFF_LEN {
        let n = reader.read(&mut head[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    reader.rewind().await?;
    Ok(detect(&head[..filled]))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn detects_magic_signatures() {
        assert_eq!(detect(b"%PDF-1.7\n%\xE2\xE3\xCF\xD3"), "application/pdf");
        assert_eq!(detect(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0]), "image/png");
    }

    #[test]
    fn falls_back_to_text_or_binary() {
        assert_eq!(detect(b"hello, world!"), TEXT_PLAIN);
        assert_eq!(detect("grüße".as_bytes()), TEXT_PLAIN);
        assert_eq!(detect(b""), TEXT_PLAIN);
        assert_eq!(detect(&[0xff, 0xfe, 0x00, 0x01, 0x02]), OCTET_STREAM);
    }

    #[test]
    fn truncated_multibyte_character_is_still_text() {
        let text = "é".repeat(SNIFF_LEN);
        let bytes = &text.as_bytes()[..SNIFF_LEN - 1];
        assert_eq!(detect(bytes), TEXT_PLAIN);
    }

    #[tokio::test]
    async fn sniff_rewinds_the_reader() {
        let mut reader = Cursor::new(b"plain text body".to_vec());

        assert_eq!(sniff(&mut reader).await.unwrap(), TEXT_PLAIN);

        let mut content = String::new();
        reader.read_to_string(&mut content).await.unwrap();
        assert_eq!(content, "plain text body");
    }
}

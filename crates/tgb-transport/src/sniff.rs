//! Content sniffing for uploaded byte buffers.
//!
//! Mirrors the WHATWG MIME sniffing table for the formats bots commonly upload;
//! only the first 512 bytes are considered.

const SNIFF_LEN: usize = 512;

/// Bytes at `offset` and the media type they identify.
struct Signature {
    offset: usize,
    pattern: &'static [u8],
    mime: &'static str,
}

const SIGNATURES: &[Signature] = &[
    sig(0, b"%PDF-", "application/pdf"),
    sig(0, b"%!PS-Adobe-", "application/postscript"),
    sig(0, b"GIF87a", "image/gif"),
    sig(0, b"GIF89a", "image/gif"),
    sig(0, b"\x89PNG\x0D\x0A\x1A\x0A", "image/png"),
    sig(0, b"\xFF\xD8\xFF", "image/jpeg"),
    sig(0, b"BM", "image/bmp"),
    sig(0, b"\x00\x00\x01\x00", "image/x-icon"),
    sig(0, b"\x00\x00\x02\x00", "image/x-icon"),
    sig(0, b"ID3", "audio/mpeg"),
    sig(0, b"OggS\x00", "application/ogg"),
    sig(0, b"MThd\x00\x00\x00\x06", "audio/midi"),
    sig(0, b"\x1A\x45\xDF\xA3", "video/webm"),
    sig(0, b"PK\x03\x04", "application/zip"),
    sig(0, b"\x1F\x8B\x08", "application/x-gzip"),
    sig(0, b"Rar!\x1A\x07\x00", "application/x-rar-compressed"),
    sig(0, b"Rar!\x1A\x07\x01\x00", "application/x-rar-compressed"),
    sig(0, b"\x00asm", "application/wasm"),
    sig(0, b"wOFF", "font/woff"),
    sig(0, b"wOF2", "font/woff2"),
];

const fn sig(offset: usize, pattern: &'static [u8], mime: &'static str) -> Signature {
    Signature {
        offset,
        pattern,
        mime,
    }
}

/// RIFF containers: bytes 8..12 name the format.
const RIFF_FORMATS: &[(&[u8], &str)] = &[
    (b"WEBPVP", "image/webp"),
    (b"WAVE", "audio/wave"),
    (b"AVI ", "video/avi"),
];

const HTML_TAGS: &[&[u8]] = &[
    b"<!DOCTYPE HTML",
    b"<HTML",
    b"<HEAD",
    b"<SCRIPT",
    b"<IFRAME",
    b"<H1",
    b"<DIV",
    b"<FONT",
    b"<TABLE",
    b"<A",
    b"<STYLE",
    b"<TITLE",
    b"<B",
    b"<BODY",
    b"<BR",
    b"<P",
    b"<!--",
];

/// Best-effort media type of `data`, or `None` for unrecognized binary content.
pub fn detect_content_type(data: &[u8]) -> Option<&'static str> {
    let data = &data[..data.len().min(SNIFF_LEN)];

    if let Some(mime) = markup_type(data) {
        return Some(mime);
    }

    if data.starts_with(b"\xFE\xFF") || data.starts_with(b"\xFF\xFE") {
        return Some("text/plain; charset=utf-16");
    }
    if data.starts_with(b"\xEF\xBB\xBF") {
        return Some("text/plain; charset=utf-8");
    }

    for s in SIGNATURES {
        if data.len() >= s.offset + s.pattern.len()
            && &data[s.offset..s.offset + s.pattern.len()] == s.pattern
        {
            return Some(s.mime);
        }
    }

    if data.len() >= 12 && data.starts_with(b"RIFF") {
        for &(format, mime) in RIFF_FORMATS {
            if data[8..].starts_with(format) {
                return Some(mime);
            }
        }
    }

    if is_mp4(data) {
        return Some("video/mp4");
    }

    if !data.iter().any(|b| is_binary_byte(*b)) {
        return Some("text/plain; charset=utf-8");
    }

    None
}

/// Extension for an upload: the media subtype without parameters, or `""`.
pub fn file_extension(data: &[u8]) -> &'static str {
    let Some(mime) = detect_content_type(data) else {
        return "";
    };
    mime.split_once('/')
        .map(|(_, sub)| sub.split(';').next().unwrap_or("").trim())
        .unwrap_or("")
}

/// File name for an upload taken from a field: `<field>.<ext>`, or just the
/// field name when the content is not recognized.
pub fn upload_file_name(field: &str, data: &[u8]) -> String {
    match file_extension(data) {
        "" => field.to_string(),
        ext => format!("{field}.{ext}"),
    }
}

fn markup_type(data: &[u8]) -> Option<&'static str> {
    let start = data
        .iter()
        .position(|b| !matches!(b, b'\t' | b'\n' | b'\x0C' | b'\r' | b' '))?;
    let rest = &data[start..];

    if rest.starts_with(b"<?xml") {
        return Some("text/xml; charset=utf-8");
    }

    for tag in HTML_TAGS {
        if rest.len() > tag.len()
            && rest[..tag.len()].eq_ignore_ascii_case(tag)
            && matches!(rest[tag.len()], b' ' | b'>')
        {
            return Some("text/html; charset=utf-8");
        }
    }
    None
}

fn is_mp4(data: &[u8]) -> bool {
    if data.len() < 12 {
        return false;
    }
    let box_size = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;
    if box_size < 12 || box_size % 4 != 0 || data.len() < box_size {
        return false;
    }
    if &data[4..8] != b"ftyp" {
        return false;
    }
    // Major brand, then compatible brands after the minor version.
    std::iter::once(8)
        .chain((16..box_size).step_by(4))
        .any(|i| data.len() >= i + 3 && &data[i..i + 3] == b"mp4")
}

fn is_binary_byte(b: u8) -> bool {
    matches!(b, 0x00..=0x08 | 0x0B | 0x0E..=0x1A | 0x1C..=0x1F)
}

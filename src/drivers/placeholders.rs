/// Byte offsets of the `?` placeholders in `sql`.
///
/// Skips quoted literals and identifiers, `--` line comments, `/* */`
/// block comments and `$tag$ ... $tag$` dollar-quoted bodies. An
/// unterminated region runs to the end of the text.
pub(crate) fn placeholder_offsets(sql: &str) -> Vec<usize> {
    let bytes = sql.as_bytes();
    let end = bytes.len();
    let mut offsets = Vec::new();
    let mut i = 0;
    while i < end {
        i = match bytes[i] {
            q @ (b'\'' | b'"') => find(bytes, i + 1, &[q]).map_or(end, |close| close + 1),
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                find(bytes, i + 2, b"\n").map_or(end, |close| close + 1)
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                find(bytes, i + 2, b"*/").map_or(end, |close| close + 2)
            }
            b'$' => match dollar_tag(bytes, i) {
                Some(len) => {
                    let tag = &bytes[i..i + len];
                    find(bytes, i + len, tag).map_or(end, |close| close + len)
                }
                None => i + 1,
            },
            b'?' => {
                offsets.push(i);
                i + 1
            }
            _ => i + 1,
        };
    }
    offsets
}

fn find(haystack: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

/// Length of the `$tag$` opener starting at `start`, if there is one.
/// `$1` style positional parameters are not openers.
fn dollar_tag(bytes: &[u8], start: usize) -> Option<usize> {
    let mut end = start + 1;
    while let Some(&b) = bytes.get(end) {
        match b {
            b'$' => return Some(end - start + 1),
            b'_' | b'a'..=b'z' | b'A'..=b'Z' => end += 1,
            b'0'..=b'9' if end > start + 1 => end += 1,
            _ => return None,
        }
    }
    None
}

//! SMTP envelope encoding of mailbox local parts.

/// Byte values that force a local part into quoted-string form: controls,
/// DEL, non-ASCII, and the RFC 5321 specials.
fn is_special(b: u8) -> bool {
    b < 0x20
        || b >= 0x7f
        || matches!(
            b,
            b' ' | b'"' | b'(' | b')' | b',' | b':' | b';' | b'<' | b'>' | b'@' | b'[' | b'\\' | b']'
        )
}

/// Dot-atom rules: non-empty, no leading/trailing '.', no "..", no specials.
pub(crate) fn needs_quoting(local: &[u8]) -> bool {
    if local.is_empty() {
        return true;
    }
    if local[0] == b'.' || local[local.len() - 1] == b'.' {
        return true;
    }
    local.windows(2).any(|w| w == b"..") || local.iter().copied().any(is_special)
}

/// Appends `local` to `out`, as a quoted-string if it is not a valid dot-atom.
pub(crate) fn encode_local_part(local: &[u8], out: &mut Vec<u8>) {
    if !needs_quoting(local) {
        out.extend_from_slice(local);
        return;
    }
    out.reserve(2 + local.len() * 2);
    out.push(b'"');
    for &b in local {
        if matches!(b, b'"' | b'\\' | b'\r' | b'\n') {
            out.push(b'\\');
        }
        out.push(b);
    }
    out.push(b'"');
}

/// Splits an address at its last '@'. Returns `None` for addresses without
/// a domain part.
pub(crate) fn split_address(address: &str) -> Option<(&str, &str)> {
    address.rsplit_once('@')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(s: &str) -> String {
        let mut out = Vec::new();
        encode_local_part(s.as_bytes(), &mut out);
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn dot_atom_passes_through() {
        assert_eq!(encode("user"), "user");
        assert_eq!(encode("first.last+tag"), "first.last+tag");
        assert_eq!(encode("a!#$%&'*/=?^_`{|}~-"), "a!#$%&'*/=?^_`{|}~-");
    }

    #[test]
    fn dots() {
        assert!(needs_quoting(b".abc"));
        assert!(needs_quoting(b"abc."));
        assert!(needs_quoting(b"a..b"));
        assert!(!needs_quoting(b"a.b"));
        assert_eq!(encode("a..b"), "\"a..b\"");
    }

    #[test]
    fn specials_are_quoted_and_escaped() {
        assert_eq!(encode("john doe"), "\"john doe\"");
        assert_eq!(encode("a\"b"), "\"a\\\"b\"");
        assert_eq!(encode("back\\slash"), "\"back\\\\slash\"");
        assert_eq!(encode("x@y"), "\"x@y\"");
        assert_eq!(encode(""), "\"\"");
    }

    #[test]
    fn non_ascii_is_quoted() {
        assert!(needs_quoting("josé".as_bytes()));
    }

    #[test]
    fn split_uses_last_at() {
        assert_eq!(split_address("\"a@b\"@example.com"), Some(("\"a@b\"", "example.com")));
        assert_eq!(split_address("postmaster"), None);
    }
}

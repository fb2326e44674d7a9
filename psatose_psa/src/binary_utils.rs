use zerocopy::{FromBytes, Ref, Unaligned};

/// Returns the part of `bytes` before the first nul, or all of `bytes` if there is none.
pub fn null_terminated_prefix(bytes: &[u8]) -> &[u8] {
    bytes.splitn(2, |&b| b == 0).next().unwrap_or_default()
}

/// Decodes a fixed-width, nul padded string field.
/// The second value is `false` if the string contained non-ascii bytes,
/// in which case they were replaced.
pub fn fixed_str(bytes: &[u8]) -> (String, bool) {
    let prefix = null_terminated_prefix(bytes);
    (String::from_utf8_lossy(prefix).into_owned(), prefix.is_ascii())
}

pub fn parse<'a, T: FromBytes + Unaligned>(bytes: &mut &'a [u8]) -> Option<&'a T> {
    let (verified, remaining) = Ref::<_, T>::new_unaligned_from_prefix(*bytes)?;
    *bytes = remaining;
    Some(verified.into_ref())
}

pub fn parse_prefix<T: FromBytes + Unaligned>(bytes: &[u8]) -> Option<&T> {
    Ref::<_, T>::new_unaligned_from_prefix(bytes).map(|(verified, _)| verified.into_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_str_trims_at_first_nul() {
        let mut field = [0_u8; 64];
        field[..4].copy_from_slice(b"root");

        assert_eq!(fixed_str(&field), ("root".to_owned(), true));
    }

    #[test]
    fn fixed_str_uses_full_width_without_nul() {
        assert_eq!(fixed_str(b"pelvis"), ("pelvis".to_owned(), true));
    }

    #[test]
    fn fixed_str_ignores_bytes_after_nul() {
        assert_eq!(fixed_str(b"spine\0junk\0"), ("spine".to_owned(), true));
    }

    #[test]
    fn fixed_str_flags_non_ascii() {
        let (name, ascii) = fixed_str(b"b\xe9ne\0\0");

        assert!(!ascii);
        assert!(name.starts_with('b'));
        assert!(name.ends_with("ne"));
    }

    #[test]
    fn parse_advances_slice() {
        let mut bytes: &[u8] = &[1, 2, 3, 4, 5];

        let first: &[u8; 2] = parse(&mut bytes).unwrap();
        assert_eq!(first, &[1, 2]);
        assert_eq!(bytes, &[3, 4, 5]);

        assert!(parse::<[u8; 4]>(&mut bytes).is_none());
        assert_eq!(bytes, &[3, 4, 5]);
    }
}

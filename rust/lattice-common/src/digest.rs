/// A [`Digest`] is a 32-byte BLAKE3 hash used to fingerprint registered code
/// and other content
pub type Digest = [u8; 32];

/// Produces the [`Digest`] of the given bytes
pub fn make_digest<B>(bytes: B) -> Digest
where
    B: AsRef<[u8]>,
{
    blake3::hash(bytes.as_ref()).as_bytes().to_owned()
}

#[cfg(test)]
mod tests {
    use super::make_digest;

    #[test]
    fn it_is_stable_for_identical_input() {
        assert_eq!(make_digest(b"fn main() {}"), make_digest(b"fn main() {}"));
    }

    #[test]
    fn it_differs_for_different_input() {
        assert_ne!(make_digest(b"left"), make_digest(b"right"));
    }
}

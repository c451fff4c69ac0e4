use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

pub const DIGEST_SIZE: usize = 32;

/// Stable content hash of a builder graph. Two digests are equal exactly when
/// the graphs that produced them are semantically identical.
pub type Digest = [u8; DIGEST_SIZE];

/// Hasher feeding type-tagged values so adjacent parameters of different
/// kinds can never collide.
pub struct ContentHasher {
    inner: blake3::Hasher,
}

impl ContentHasher {
    fn new() -> Self {
        Self { inner: blake3::Hasher::new() }
    }

    fn mark(&mut self, tag: u8) {
        self.inner.update(&[tag]);
    }

    pub fn write_bool(&mut self, value: bool) {
        self.mark(b'b');
        self.inner.update(&[value as u8]);
    }

    pub fn write_u8(&mut self, value: u8) {
        self.mark(b'c');
        self.inner.update(&[value]);
    }

    pub fn write_u32(&mut self, value: u32) {
        self.mark(b'u');
        self.inner.update(&value.to_le_bytes());
    }

    pub fn write_u64(&mut self, value: u64) {
        self.mark(b'U');
        self.inner.update(&value.to_le_bytes());
    }

    pub fn write_i32(&mut self, value: i32) {
        self.mark(b'i');
        self.inner.update(&value.to_le_bytes());
    }

    pub fn write_f32(&mut self, value: f32) {
        self.mark(b'g');
        self.inner.update(&value.to_bits().to_le_bytes());
    }

    pub fn write_f64(&mut self, value: f64) {
        self.mark(b'f');
        self.inner.update(&value.to_bits().to_le_bytes());
    }

    pub fn write_str(&mut self, value: &str) {
        self.mark(b's');
        self.inner.update(&(value.len() as u64).to_le_bytes());
        self.inner.update(value.as_bytes());
    }

    pub fn write_bytes(&mut self, value: &[u8]) {
        self.mark(b'B');
        self.inner.update(&(value.len() as u64).to_le_bytes());
        self.inner.update(value);
    }

    pub fn write_digest(&mut self, value: &Digest) {
        self.mark(b'd');
        self.inner.update(value);
    }
}

/// Computes a digest from a name discriminator plus whatever the callback
/// feeds. The result depends only on the fed values, never on addresses or
/// iteration order, so it is stable across processes.
pub fn create_digest(name: &str, feed: impl FnOnce(&mut ContentHasher)) -> Digest {
    let mut hasher = ContentHasher::new();
    hasher.write_str(name);
    feed(&mut hasher);
    *hasher.inner.finalize().as_bytes()
}

/// Digest of a file's raw bytes, for providers backed by source files.
pub fn digest_file(path: impl AsRef<Path>) -> Result<Digest> {
    let path = path.as_ref();
    let bytes =
        fs::read(path).with_context(|| format!("digesting source file {}", path.display()))?;
    Ok(create_digest("file", |hasher| hasher.write_bytes(&bytes)))
}

pub fn digest_hex(digest: &Digest) -> String {
    let mut out = String::with_capacity(DIGEST_SIZE * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

/// Values that can feed their content into a digest.
pub trait Digestible {
    fn digest_content(&self, hasher: &mut ContentHasher);
}

impl Digestible for bool {
    fn digest_content(&self, hasher: &mut ContentHasher) {
        hasher.write_bool(*self);
    }
}

impl Digestible for u32 {
    fn digest_content(&self, hasher: &mut ContentHasher) {
        hasher.write_u32(*self);
    }
}

impl Digestible for i32 {
    fn digest_content(&self, hasher: &mut ContentHasher) {
        hasher.write_i32(*self);
    }
}

impl Digestible for f32 {
    fn digest_content(&self, hasher: &mut ContentHasher) {
        hasher.write_f32(*self);
    }
}

impl Digestible for f64 {
    fn digest_content(&self, hasher: &mut ContentHasher) {
        hasher.write_f64(*self);
    }
}

impl Digestible for String {
    fn digest_content(&self, hasher: &mut ContentHasher) {
        hasher.write_str(self);
    }
}

impl Digestible for &str {
    fn digest_content(&self, hasher: &mut ContentHasher) {
        hasher.write_str(self);
    }
}

impl<T: Digestible> Digestible for Option<T> {
    fn digest_content(&self, hasher: &mut ContentHasher) {
        match self {
            Some(value) => {
                hasher.write_bool(true);
                value.digest_content(hasher);
            }
            None => hasher.write_bool(false),
        }
    }
}

impl<T: Digestible> Digestible for Vec<T> {
    fn digest_content(&self, hasher: &mut ContentHasher) {
        hasher.write_u64(self.len() as u64);
        for item in self {
            item.digest_content(hasher);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_stable_across_calls() {
        let feed = |hasher: &mut ContentHasher| {
            hasher.write_str("emissive");
            hasher.write_f64(0.25);
            hasher.write_bool(true);
        };
        assert_eq!(create_digest("material", feed), create_digest("material", feed));
    }

    #[test]
    fn digest_is_sensitive_to_every_input() {
        let base = create_digest("material", |h| h.write_f64(0.25));
        assert_ne!(base, create_digest("material", |h| h.write_f64(0.26)));
        assert_ne!(base, create_digest("texture", |h| h.write_f64(0.25)));
        assert_ne!(base, create_digest("material", |h| h.write_f32(0.25)));
    }

    #[test]
    fn adjacent_values_of_different_kinds_do_not_collide() {
        let as_str = create_digest("item", |h| h.write_str("ab"));
        let as_bytes = create_digest("item", |h| h.write_bytes(b"ab"));
        assert_ne!(as_str, as_bytes);
    }

    #[test]
    fn hex_rendering_is_lowercase_and_full_width() {
        let digest = create_digest("x", |_| {});
        let hex = digest_hex(&digest);
        assert_eq!(hex.len(), DIGEST_SIZE * 2);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}

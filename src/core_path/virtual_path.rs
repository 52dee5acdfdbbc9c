use std::fmt;

/// An absolute, normalized location inside the served tree.
///
/// Segments are raw bytes: names that are not valid UTF-8 are kept exactly
/// as the client sent them. The segment list never holds `""`, `"."` or
/// `".."`; the root is the empty list. Two paths denote the same location
/// iff they compare equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct VirtualPath {
    segments: Vec<Vec<u8>>,
}

impl VirtualPath {
    pub fn root() -> Self {
        Self::default()
    }

    /// Normalizes `input` against the root.
    pub fn parse(input: impl AsRef<[u8]>) -> Self {
        Self::root().join(input)
    }

    /// Resolves client input against this path.
    ///
    /// A leading `/` restarts from the root. `..` above the root is absorbed.
    pub fn join(&self, input: impl AsRef<[u8]>) -> Self {
        let input = input.as_ref();
        let mut segments = if input.first() == Some(&b'/') {
            Vec::new()
        } else {
            self.segments.clone()
        };

        for segment in input.split(|&byte| byte == b'/') {
            match segment {
                b"" | b"." => {}
                b".." => {
                    segments.pop();
                }
                name => segments.push(name.to_vec()),
            }
        }

        Self { segments }
    }

    /// Appends one directory entry name as it is stored in the tree.
    pub fn child(&self, name: &[u8]) -> Self {
        let mut segments = self.segments.clone();
        segments.push(name.to_vec());
        Self { segments }
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[Vec<u8>] {
        &self.segments
    }

    /// The absolute path as raw bytes, for replies to the client.
    pub fn to_bytes(&self) -> Vec<u8> {
        if self.is_root() {
            return b"/".to_vec();
        }
        let mut out = Vec::new();
        for segment in &self.segments {
            out.push(b'/');
            out.extend_from_slice(segment);
        }
        out
    }

    /// The path as the tree provider expects it: relative, no leading `/`.
    /// `None` for the root, which the provider only hands out directly.
    pub fn to_provider_path(&self) -> Option<Vec<u8>> {
        if self.is_root() {
            None
        } else {
            Some(self.segments.join(&b'/'))
        }
    }
}

/// Lossy rendering, for logs and error messages.
impl fmt::Display for VirtualPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.to_bytes()))
    }
}

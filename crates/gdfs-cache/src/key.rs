use std::fmt;

/// What a cache entry maps from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyKind {
    /// Object ID → cached object record.
    Object,
    /// Normalised path → object ID.
    Path,
    /// The list of top-level drives.
    Containers,
}

impl KeyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            KeyKind::Object => "obj",
            KeyKind::Path => "path",
            KeyKind::Containers => "drives",
        }
    }
}

/// Namespaced cache key.
///
/// [`CacheKey::encode`] is the only place keys become strings. The namespace
/// is length-prefixed, so distinct keys never encode to the same string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey<'a> {
    pub namespace: &'a str,
    pub kind: KeyKind,
    pub subject: &'a str,
}

impl<'a> CacheKey<'a> {
    pub fn object(namespace: &'a str, id: &'a str) -> Self {
        Self { namespace, kind: KeyKind::Object, subject: id }
    }

    pub fn path(namespace: &'a str, path: &'a str) -> Self {
        Self { namespace, kind: KeyKind::Path, subject: path }
    }

    pub fn containers(namespace: &'a str) -> Self {
        Self { namespace, kind: KeyKind::Containers, subject: "" }
    }

    pub fn encode(&self) -> String {
        format!(
            "gdfs:{}:{}:{}:{}",
            self.namespace.len(),
            self.namespace,
            self.kind.as_str(),
            self.subject
        )
    }
}

impl fmt::Display for CacheKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_layout() {
        assert_eq!(CacheKey::object("ns", "abc").encode(), "gdfs:2:ns:obj:abc");
        assert_eq!(CacheKey::path("ns", "/Team").encode(), "gdfs:2:ns:path:/Team");
        assert_eq!(CacheKey::containers("ns").encode(), "gdfs:2:ns:drives:");
    }

    #[test]
    fn test_kinds_do_not_collide() {
        assert_ne!(
            CacheKey::object("ns", "x").encode(),
            CacheKey::path("ns", "x").encode()
        );
    }

    #[test]
    fn test_namespaces_do_not_collide() {
        // "a:path" + "x" vs "a" + path "path:x"-style ambiguity
        let k1 = CacheKey::path("a:obj", "x").encode();
        let k2 = CacheKey::object("a", "x").encode();
        assert_ne!(k1, k2);
        let k3 = CacheKey::path("a", "b").encode();
        let k4 = CacheKey::path("a:path:", "b").encode();
        assert_ne!(k3, k4);
    }

    #[test]
    fn test_display_matches_encode() {
        let k = CacheKey::object("ns", "id");
        assert_eq!(k.to_string(), k.encode());
    }
}

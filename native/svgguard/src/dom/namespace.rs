//! Namespace Scope Tracking
//!
//! Stack of prefix declarations used to reject undeclared prefixes on
//! elements and attributes. URIs are kept but never dereferenced.

/// Well-known namespace URIs
pub mod ns {
    pub const XML: &[u8] = b"http://www.w3.org/XML/1998/namespace";
    pub const XMLNS: &[u8] = b"http://www.w3.org/2000/xmlns/";
}

#[derive(Debug, Clone)]
struct NsBinding<'a> {
    prefix: &'a [u8],
    uri: &'a [u8],
    depth: usize,
}

/// Prefix bindings in scope at the current element depth
#[derive(Debug)]
pub struct NamespaceScope<'a> {
    bindings: Vec<NsBinding<'a>>,
    depth: usize,
}

impl Default for NamespaceScope<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> NamespaceScope<'a> {
    /// Scope with the built-in `xml` and `xmlns` prefixes bound
    pub fn new() -> Self {
        NamespaceScope {
            bindings: vec![
                NsBinding { prefix: b"xml", uri: ns::XML, depth: 0 },
                NsBinding { prefix: b"xmlns", uri: ns::XMLNS, depth: 0 },
            ],
            depth: 0,
        }
    }

    /// Enter an element scope
    pub fn push_scope(&mut self) {
        self.depth += 1;
    }

    /// Leave an element scope, dropping any bindings declared in it
    pub fn pop_scope(&mut self) {
        while self.bindings.last().is_some_and(|b| b.depth >= self.depth) {
            self.bindings.pop();
        }
        self.depth = self.depth.saturating_sub(1);
    }

    /// Bind a prefix in the current scope
    pub fn declare(&mut self, prefix: &'a [u8], uri: &'a [u8]) {
        self.bindings.push(NsBinding {
            prefix,
            uri,
            depth: self.depth,
        });
    }

    /// Resolve a prefix to its URI, innermost binding first
    pub fn resolve(&self, prefix: &[u8]) -> Option<&'a [u8]> {
        self.bindings
            .iter()
            .rev()
            .find(|b| b.prefix == prefix)
            .map(|b| b.uri)
    }

    pub fn is_declared(&self, prefix: &[u8]) -> bool {
        self.resolve(prefix).is_some()
    }
}

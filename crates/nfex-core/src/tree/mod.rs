//! Generic document tree and value location.
//!
//! A parsed XML document becomes a [`Node`] tree: ordered maps for elements,
//! sequences for repeated sibling tags, text scalars for leaves. Attributes
//! live under `@name` keys and mixed text under `#text`, mirroring the shape
//! accountants' NFe tooling conventionally works with.
//!
//! Two lookups are provided: [`Node::locate`] resolves an exact dotted path
//! (`"emit.CNPJ"`), and [`Node::search`] is a depth-first keyword search used
//! as a fallback when no candidate path matches. Both treat the empty string
//! and the literal text `"None"` (any case) as "no real data".

mod xml;

pub use xml::parse_document;

/// One node of a parsed document tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// An element with children and/or attributes. Insertion order equals
    /// document order; duplicate tag names are collapsed into one `Seq` entry.
    Map(Vec<(String, Node)>),
    /// Repeated sibling elements under one tag name.
    Seq(Vec<Node>),
    /// A text leaf (element text, attribute value, or `#text`).
    Text(String),
}

/// True when a resolved text value carries no real data.
fn is_absent_text(value: &str) -> bool {
    value.is_empty() || value.eq_ignore_ascii_case("none")
}

impl Node {
    /// Look up a direct child by exact key. Maps only.
    pub fn get(&self, key: &str) -> Option<&Node> {
        match self {
            Node::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Resolve this node to a scalar, if it has one.
    ///
    /// A `Map` resolves through its `#text` entry; a `Seq` through its first
    /// element (documents are assumed single-invoice, so repeated elements
    /// beyond the first are not aggregated).
    pub fn scalar(&self) -> Option<&str> {
        match self {
            Node::Text(s) => Some(s.as_str()),
            Node::Map(_) => self.get("#text").and_then(Node::scalar),
            Node::Seq(items) => items.first().and_then(Node::scalar),
        }
    }

    /// Resolve a dotted path (`"emit.CNPJ"`) against the tree.
    ///
    /// Each segment descends one map level with an exact key match. Returns
    /// `None` if any segment lands on a non-map, the key is missing, the
    /// traversal runs past a scalar, or the resolved value is empty/`"None"`.
    pub fn locate(&self, path: &str) -> Option<&str> {
        let mut current = self;
        for segment in path.split('.') {
            current = current.get(segment)?;
        }
        current.scalar().filter(|v| !is_absent_text(v))
    }

    /// Depth-first keyword search over the whole tree.
    ///
    /// Returns the scalar under the first key whose name matches any of
    /// `keys` (case-insensitive, to tolerate issuer-software casing
    /// variance), in document order. With `context`, the search is strictly
    /// contained in the first subtree rooted at a key of that name: if the
    /// context subtree exists but holds no match, there is no unscoped
    /// fallback — a missing value beats a value from the wrong business
    /// entity. Sequence descent considers only the first element.
    pub fn search(&self, keys: &[&str], context: Option<&str>) -> Option<&str> {
        let root = match context {
            Some(ctx) => self.find_subtree(ctx)?,
            None => self,
        };
        root.search_keys(keys)
    }

    /// Find the first subtree rooted at a key named `context`, document order.
    fn find_subtree(&self, context: &str) -> Option<&Node> {
        match self {
            Node::Map(entries) => {
                for (key, value) in entries {
                    if key.eq_ignore_ascii_case(context) {
                        return Some(value);
                    }
                    if let Some(found) = value.find_subtree(context) {
                        return Some(found);
                    }
                }
                None
            }
            Node::Seq(items) => items.first().and_then(|n| n.find_subtree(context)),
            Node::Text(_) => None,
        }
    }

    fn search_keys(&self, keys: &[&str]) -> Option<&str> {
        match self {
            Node::Map(entries) => {
                for (key, value) in entries {
                    if keys.iter().any(|k| k.eq_ignore_ascii_case(key)) {
                        if let Some(found) = value.scalar().filter(|v| !is_absent_text(v)) {
                            return Some(found);
                        }
                    }
                    if let Some(found) = value.search_keys(keys) {
                        return Some(found);
                    }
                }
                None
            }
            Node::Seq(items) => items.first().and_then(|n| n.search_keys(keys)),
            Node::Text(_) => None,
        }
    }

    /// Enumerate every dotted key path in the document, sorted and deduplicated.
    ///
    /// For sequences only the first element is analyzed, so repeated tags
    /// contribute one path each. Useful for letting users discover which
    /// fields a given issuer's XML actually carries.
    pub fn paths(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_paths("", &mut out);
        out.sort();
        out.dedup();
        out
    }

    fn collect_paths(&self, prefix: &str, out: &mut Vec<String>) {
        match self {
            Node::Map(entries) => {
                for (key, value) in entries {
                    let path = if prefix.is_empty() {
                        key.clone()
                    } else {
                        format!("{prefix}.{key}")
                    };
                    out.push(path.clone());
                    value.collect_paths(&path, out);
                }
            }
            Node::Seq(items) => {
                if let Some(first) = items.first() {
                    first.collect_paths(prefix, out);
                }
            }
            Node::Text(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn map(entries: Vec<(&str, Node)>) -> Node {
        Node::Map(entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }

    fn text(s: &str) -> Node {
        Node::Text(s.to_string())
    }

    fn sample_invoice() -> Node {
        map(vec![(
            "infNFe",
            map(vec![
                ("@Id", text("NFe35240112345678000195550010000000011000000010")),
                ("ide", map(vec![("nNF", text("123")), ("dhEmi", text("2024-03-15T10:00:00-03:00"))])),
                (
                    "emit",
                    map(vec![("CNPJ", text("12345678000195")), ("xNome", text("Acme Ltda"))]),
                ),
                (
                    "dest",
                    map(vec![("CNPJ", text("98765432000100")), ("xNome", text("Beta SA"))]),
                ),
                (
                    "total",
                    map(vec![(
                        "ICMSTot",
                        map(vec![("vNF", text("1.234,56")), ("vProd", text("1.000,00"))]),
                    )]),
                ),
            ]),
        )])
    }

    #[test]
    fn test_locate_dotted_path() {
        let tree = sample_invoice();
        assert_eq!(tree.locate("infNFe.emit.CNPJ"), Some("12345678000195"));
        assert_eq!(tree.locate("infNFe.@Id").unwrap().len(), 47);
    }

    #[test]
    fn test_locate_missing_segment() {
        let tree = sample_invoice();
        assert_eq!(tree.locate("infNFe.emit.IE"), None);
        assert_eq!(tree.locate("nope.emit.CNPJ"), None);
        // Traversal past a scalar.
        assert_eq!(tree.locate("infNFe.emit.CNPJ.digit"), None);
    }

    #[test]
    fn test_locate_absent_normalization() {
        let tree = map(vec![
            ("empty", text("")),
            ("a", text("None")),
            ("b", text("none")),
            ("c", text("NONE")),
        ]);
        assert_eq!(tree.locate("empty"), None);
        assert_eq!(tree.locate("a"), None);
        assert_eq!(tree.locate("b"), None);
        assert_eq!(tree.locate("c"), None);
        assert_eq!(tree.locate("missing"), None);
    }

    #[test]
    fn test_locate_map_resolves_through_text_entry() {
        let tree = map(vec![(
            "obs",
            map(vec![("@tipo", text("livre")), ("#text", text("sem reservas"))]),
        )]);
        assert_eq!(tree.locate("obs"), Some("sem reservas"));
        // A map without #text is not a scalar.
        let bare = map(vec![("obs", map(vec![("@tipo", text("livre"))]))]);
        assert_eq!(bare.locate("obs"), None);
    }

    #[test]
    fn test_search_document_order_wins() {
        let tree = map(vec![
            ("first", map(vec![("valor", text("um"))])),
            ("second", map(vec![("valor", text("dois"))])),
        ]);
        assert_eq!(tree.search(&["valor"], None), Some("um"));
    }

    #[test]
    fn test_search_case_insensitive_keys() {
        let tree = map(vec![("emit", map(vec![("XNOME", text("Acme"))]))]);
        assert_eq!(tree.search(&["xNome"], Some("emit")), Some("Acme"));
    }

    #[test]
    fn test_search_context_containment() {
        let tree = sample_invoice();
        assert_eq!(tree.search(&["CNPJ"], Some("emit")), Some("12345678000195"));
        assert_eq!(tree.search(&["CNPJ"], Some("dest")), Some("98765432000100"));
    }

    #[test]
    fn test_search_no_unscoped_fallback() {
        // CNPJ exists only under emit; a dest-scoped search must not find it,
        // whether dest is missing entirely or present without the key.
        let emit_only = map(vec![("emit", map(vec![("CNPJ", text("12345678000195"))]))]);
        assert_eq!(emit_only.search(&["CNPJ"], Some("dest")), None);

        let with_dest = map(vec![
            ("emit", map(vec![("CNPJ", text("12345678000195"))])),
            ("dest", map(vec![("xNome", text("Beta"))])),
        ]);
        assert_eq!(with_dest.search(&["CNPJ"], Some("dest")), None);
    }

    #[test]
    fn test_search_seq_first_element_only() {
        let tree = map(vec![(
            "det",
            Node::Seq(vec![
                map(vec![("vProd", text("10,00"))]),
                map(vec![("vProd", text("20,00"))]),
            ]),
        )]);
        assert_eq!(tree.search(&["vProd"], None), Some("10,00"));
    }

    #[test]
    fn test_search_skips_absent_values() {
        let tree = map(vec![
            ("emit", map(vec![("xNome", text("None"))])),
            ("razao", map(vec![("xNome", text("Acme"))])),
        ]);
        assert_eq!(tree.search(&["xNome"], None), Some("Acme"));
    }

    #[test]
    fn test_paths_enumeration() {
        let tree = map(vec![(
            "ide",
            map(vec![("nNF", text("1")), ("serie", text("1"))]),
        )]);
        assert_eq!(
            tree.paths(),
            vec!["ide".to_string(), "ide.nNF".to_string(), "ide.serie".to_string()]
        );
    }
}

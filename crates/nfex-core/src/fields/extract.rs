//! Field extraction: one document tree in, one flat typed record out.

use tracing::{debug, trace};

use super::coerce;
use super::mapping::{FieldKind, FieldMapping};
use crate::table::Cell;
use crate::tree::Node;

/// Result of extracting one document.
///
/// `values` is aligned with the mapping's field order and always has one
/// cell per configured field — unresolved fields are `Null`, never absent.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionOutcome {
    /// One cell per mapping field, in mapping order.
    pub values: Vec<Cell>,
    /// Names of fields no candidate path or fallback could resolve.
    pub missing: Vec<String>,
}

/// Extracts the configured fields from parsed document trees.
///
/// The mapping is immutable configuration; one extractor serves a whole
/// batch, each call owning only the tree it was given.
pub struct FieldExtractor {
    mapping: FieldMapping,
}

impl FieldExtractor {
    pub fn new(mapping: FieldMapping) -> Self {
        Self { mapping }
    }

    pub fn mapping(&self) -> &FieldMapping {
        &self.mapping
    }

    /// Resolve every configured field against `tree`.
    ///
    /// Candidate paths are tried in listed order, first non-absent match
    /// wins; the entry's keyword fallback runs only when all paths miss.
    /// Resolution misses are not errors — the field lands as `Null` and is
    /// listed in [`ExtractionOutcome::missing`].
    pub fn extract(&self, tree: &Node) -> ExtractionOutcome {
        let mut values = Vec::with_capacity(self.mapping.len());
        let mut missing = Vec::new();

        for spec in self.mapping.fields() {
            let raw = spec
                .paths
                .iter()
                .find_map(|path| tree.locate(path))
                .or_else(|| {
                    spec.fallback.as_ref().and_then(|rule| {
                        let keys: Vec<&str> = rule.keys.iter().map(String::as_str).collect();
                        let found = tree.search(&keys, rule.context.as_deref());
                        if found.is_some() {
                            trace!(field = %spec.name, "resolved via keyword fallback");
                        }
                        found
                    })
                });

            match raw {
                Some(raw) => values.push(coerce_value(raw, spec.kind)),
                None => {
                    missing.push(spec.name.clone());
                    values.push(Cell::Null);
                }
            }
        }

        if !missing.is_empty() {
            debug!(fields = ?missing, "unresolved fields in document");
        }

        ExtractionOutcome { values, missing }
    }
}

/// Coerce a resolved raw value according to the field's declared kind.
///
/// Currency failures default to zero and date failures to `Null`; a raw
/// value never aborts the record it belongs to.
fn coerce_value(raw: &str, kind: FieldKind) -> Cell {
    match kind {
        FieldKind::Currency => Cell::Number(coerce::coerce_currency(raw)),
        FieldKind::Date => match coerce::coerce_datetime(raw) {
            Some(dt) => Cell::DateTime(dt),
            None => Cell::Null,
        },
        FieldKind::Document => Cell::Text(coerce::format_document(raw)),
        FieldKind::Text => Cell::Text(coerce::clean_text(raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::mapping::FieldSpec;
    use crate::tree::parse_document;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn extractor() -> FieldExtractor {
        FieldExtractor::new(FieldMapping::nfe_default())
    }

    const FULL_NFE: &str = r#"<nfeProc versao="4.00">
      <NFe><infNFe Id="NFe35240112345678000195550010000000011000000010">
        <ide><nNF>123</nNF><dhEmi>2024-03-15T10:00:00-03:00</dhEmi></ide>
        <emit><CNPJ>12345678000195</CNPJ><xNome>Acme  Ltda</xNome></emit>
        <dest><CNPJ>98765432000100</CNPJ><xNome>Beta SA</xNome></dest>
        <total><ICMSTot><vProd>1.000,00</vProd><vNF>1.234,56</vNF></ICMSTot></total>
      </infNFe></NFe>
      <protNFe><infProt><chNFe>35240112345678000195550010000000011000000010</chNFe></infProt></protNFe>
    </nfeProc>"#;

    #[test]
    fn test_extract_full_document() {
        let tree = parse_document(FULL_NFE).unwrap();
        let outcome = extractor().extract(&tree);

        assert_eq!(outcome.missing, Vec::<String>::new());
        assert_eq!(outcome.values[0], Cell::Text("123".into()));
        assert_eq!(
            outcome.values[1].to_string(),
            "2024-03-15 10:00:00",
            "offset stripped, not converted"
        );
        assert_eq!(outcome.values[2], Cell::Text("12.345.678/0001-95".into()));
        assert_eq!(outcome.values[3], Cell::Text("Acme Ltda".into()));
        assert_eq!(outcome.values[4], Cell::Text("98.765.432/0001-00".into()));
        assert_eq!(
            outcome.values[6],
            Cell::Number(Decimal::from_str("1234.56").unwrap())
        );
        // Depth-first document order: the infNFe @Id attribute precedes the
        // protNFe chNFe element, so the fallback lands on it first.
        assert_eq!(
            outcome.values[8],
            Cell::Text("NFe35240112345678000195550010000000011000000010".into())
        );
    }

    #[test]
    fn test_record_key_set_is_fixed() {
        // A document containing none of the configured fields still yields
        // one cell per mapping field.
        let tree = parse_document("<root><foo>bar</foo></root>").unwrap();
        let outcome = extractor().extract(&tree);
        assert_eq!(outcome.values.len(), 9);
        assert!(outcome.values.iter().all(Cell::is_null));
        assert_eq!(outcome.missing.len(), 9);
    }

    #[test]
    fn test_path_precedence_first_match_wins() {
        let tree = parse_document("<root><a><b>um</b></a><c><d>dois</d></c></root>").unwrap();
        let mapping = FieldMapping::new(vec![
            FieldSpec::new("campo", ["root.a.b", "root.c.d"]).with_kind(FieldKind::Text),
        ]);
        let outcome = FieldExtractor::new(mapping).extract(&tree);
        assert_eq!(outcome.values[0], Cell::Text("um".into()));
    }

    #[test]
    fn test_fallback_scoped_to_emitter() {
        // xNome reachable only via the emit-scoped keyword fallback; the
        // dest xNome must not bleed into the issuer column.
        let xml = r#"<NFe><infNFe>
            <emit><razaoSocial><dados><xNome>Beta</xNome></dados></razaoSocial></emit>
            <dest><xNome>Cliente</xNome></dest>
        </infNFe></NFe>"#;
        let tree = parse_document(xml).unwrap();
        let outcome = extractor().extract(&tree);
        assert_eq!(outcome.values[3], Cell::Text("Beta".into()));
        assert_eq!(outcome.values[5], Cell::Text("Cliente".into()));
    }

    #[test]
    fn test_currency_coercion_failure_defaults_to_zero() {
        let xml = "<NFe><infNFe><total><ICMSTot><vNF>abc</vNF></ICMSTot></total></infNFe></NFe>";
        let tree = parse_document(xml).unwrap();
        let outcome = extractor().extract(&tree);
        assert_eq!(outcome.values[6], Cell::Number(Decimal::ZERO));
    }

    #[test]
    fn test_unparseable_date_is_null_not_error() {
        let xml = "<NFe><infNFe><ide><dhEmi>ontem</dhEmi></ide></infNFe></NFe>";
        let tree = parse_document(xml).unwrap();
        let outcome = extractor().extract(&tree);
        assert_eq!(outcome.values[1], Cell::Null);
        // The raw value resolved, so the field is not reported missing.
        assert!(!outcome.missing.contains(&"Data de Emissão".to_string()));
    }

    #[test]
    fn test_fallback_rule_without_context_finds_attribute() {
        let xml = r#"<NFe><infNFe Id="NFe999"><ide><nNF>1</nNF></ide></infNFe></NFe>"#;
        let tree = parse_document(xml).unwrap();
        let outcome = extractor().extract(&tree);
        assert_eq!(outcome.values[8], Cell::Text("NFe999".into()));
    }
}

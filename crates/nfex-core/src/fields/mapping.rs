//! Declarative field mapping: business field name -> candidate paths.
//!
//! Each entry carries its candidate dotted paths in priority order, an
//! explicit value kind, and an optional keyword-search fallback rule. The
//! fallback rules are data attached to the entry, not inferred from the
//! field name at runtime, so the rule set is independently testable.

use serde::{Deserialize, Serialize};

/// How a resolved raw value is coerced before landing in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Brazilian-formatted amount, coerced to a decimal (default zero).
    Currency,
    /// Multi-format date/datetime, coerced or null.
    Date,
    /// CNPJ/CPF, digits masked for display.
    Document,
    /// Plain text, whitespace-cleaned.
    Text,
}

impl FieldKind {
    /// Infer a kind from a field name, using the conventional substrings of
    /// accounting column names (`valor`/`total` money, `data` dates,
    /// `cnpj`/`cpf` tax ids). Used for user-authored mappings; the built-in
    /// NFe mapping states kinds explicitly.
    pub fn infer(field_name: &str) -> Self {
        let lower = field_name.to_lowercase();
        if lower.contains("valor") || lower.contains("total") {
            FieldKind::Currency
        } else if lower.contains("data") {
            FieldKind::Date
        } else if lower.contains("cnpj") || lower.contains("cpf") {
            FieldKind::Document
        } else {
            FieldKind::Text
        }
    }
}

/// Keyword-search fallback applied when no candidate path resolves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackRule {
    /// Key names to look for, tried against the tree depth-first.
    pub keys: Vec<String>,
    /// Optional containment context (e.g. `emit` vs `dest`) so a value is
    /// never taken from the wrong business entity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl FallbackRule {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
            context: None,
        }
    }

    pub fn scoped<I, S>(keys: I, context: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
            context: Some(context.into()),
        }
    }
}

/// One configured business field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Human-readable column name (e.g. `"Valor Total"`).
    pub name: String,
    /// Candidate dotted paths, tried in listed order; first match wins.
    pub paths: Vec<String>,
    /// Value coercion applied to the resolved raw value.
    pub kind: FieldKind,
    /// Keyword search used only when every candidate path misses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<FallbackRule>,
}

impl FieldSpec {
    pub fn new<I, S>(name: impl Into<String>, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        let kind = FieldKind::infer(&name);
        Self {
            name,
            paths: paths.into_iter().map(Into::into).collect(),
            kind,
            fallback: None,
        }
    }

    pub fn with_kind(mut self, kind: FieldKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_fallback(mut self, fallback: FallbackRule) -> Self {
        self.fallback = Some(fallback);
        self
    }
}

/// Ordered field configuration, shared read-only across a whole batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMapping {
    fields: Vec<FieldSpec>,
}

impl FieldMapping {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Column names in mapping order.
    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    /// The standard NFe (Nota Fiscal Eletrônica) mapping.
    ///
    /// Candidate paths cover the schema variants seen across issuer
    /// software: bare element names, pre-flattened exports, and the full
    /// `nfe.infNFe` nesting. Fallbacks are scoped to the owning NFe group
    /// (`ide`, `emit`, `dest`, `ICMSTot`) so issuer and recipient values
    /// never cross; `dEmi` covers the NFe 2.x date element.
    pub fn nfe_default() -> Self {
        Self::new(vec![
            FieldSpec::new("Número da Nota", ["nNF", "numero", "nfe.infNFe.ide.nNF"])
                .with_kind(FieldKind::Text)
                .with_fallback(FallbackRule::scoped(["nNF"], "ide")),
            FieldSpec::new("Data de Emissão", ["dhEmi", "dataEmissao", "nfe.infNFe.ide.dhEmi"])
                .with_kind(FieldKind::Date)
                .with_fallback(FallbackRule::scoped(["dhEmi", "dEmi"], "ide")),
            FieldSpec::new("CNPJ Emitente", ["emit.CNPJ", "emitente.cnpj", "nfe.infNFe.emit.CNPJ"])
                .with_kind(FieldKind::Document)
                .with_fallback(FallbackRule::scoped(["CNPJ", "CPF"], "emit")),
            FieldSpec::new("Nome Emitente", ["emit.xNome", "emitente.nome", "nfe.infNFe.emit.xNome"])
                .with_kind(FieldKind::Text)
                .with_fallback(FallbackRule::scoped(["xNome", "nome"], "emit")),
            FieldSpec::new(
                "CNPJ Destinatário",
                ["dest.CNPJ", "destinatario.cnpj", "nfe.infNFe.dest.CNPJ"],
            )
            .with_kind(FieldKind::Document)
            .with_fallback(FallbackRule::scoped(["CNPJ", "CPF"], "dest")),
            FieldSpec::new(
                "Nome Destinatário",
                ["dest.xNome", "destinatario.nome", "nfe.infNFe.dest.xNome"],
            )
            .with_kind(FieldKind::Text)
            .with_fallback(FallbackRule::scoped(["xNome", "nome"], "dest")),
            FieldSpec::new(
                "Valor Total",
                ["vNF", "valorTotal", "nfe.infNFe.total.ICMSTot.vNF", "total.ICMSTot.vNF"],
            )
            .with_kind(FieldKind::Currency)
            .with_fallback(FallbackRule::scoped(["vNF"], "ICMSTot")),
            FieldSpec::new(
                "Valor Produtos",
                ["vProd", "valorProdutos", "nfe.infNFe.total.ICMSTot.vProd", "total.ICMSTot.vProd"],
            )
            .with_kind(FieldKind::Currency)
            .with_fallback(FallbackRule::scoped(["vProd"], "ICMSTot")),
            FieldSpec::new("Chave NFe", ["chNFe", "chave", "nfe.infNFe.@Id", "protNFe.infProt.chNFe"])
                .with_kind(FieldKind::Text)
                .with_fallback(FallbackRule::new(["chNFe", "@Id"])),
        ])
    }
}

impl Default for FieldMapping {
    fn default() -> Self {
        Self::nfe_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_infer_kind_from_name() {
        assert_eq!(FieldKind::infer("Valor Total"), FieldKind::Currency);
        assert_eq!(FieldKind::infer("total bruto"), FieldKind::Currency);
        assert_eq!(FieldKind::infer("Data de Emissão"), FieldKind::Date);
        assert_eq!(FieldKind::infer("CNPJ Emitente"), FieldKind::Document);
        assert_eq!(FieldKind::infer("cpf do cliente"), FieldKind::Document);
        assert_eq!(FieldKind::infer("Número da Nota"), FieldKind::Text);
    }

    #[test]
    fn test_default_mapping_field_order() {
        let mapping = FieldMapping::nfe_default();
        assert_eq!(
            mapping.field_names(),
            vec![
                "Número da Nota",
                "Data de Emissão",
                "CNPJ Emitente",
                "Nome Emitente",
                "CNPJ Destinatário",
                "Nome Destinatário",
                "Valor Total",
                "Valor Produtos",
                "Chave NFe",
            ]
        );
    }

    #[test]
    fn test_mapping_roundtrips_through_json() {
        let mapping = FieldMapping::nfe_default();
        let json = serde_json::to_string(&mapping).unwrap();
        let back: FieldMapping = serde_json::from_str(&json).unwrap();
        assert_eq!(back, mapping);
    }

    #[test]
    fn test_mapping_deserializes_without_optional_parts() {
        let json = r#"{"fields":[{"name":"Valor Total","paths":["vNF"],"kind":"currency"}]}"#;
        let mapping: FieldMapping = serde_json::from_str(json).unwrap();
        assert_eq!(mapping.fields()[0].fallback, None);
    }

    #[test]
    fn test_fallback_rules_are_entity_scoped() {
        let mapping = FieldMapping::nfe_default();
        let by_name = |name: &str| {
            mapping
                .fields()
                .iter()
                .find(|f| f.name == name)
                .and_then(|f| f.fallback.clone())
                .unwrap()
        };

        assert_eq!(by_name("CNPJ Emitente").context.as_deref(), Some("emit"));
        assert_eq!(by_name("CNPJ Destinatário").context.as_deref(), Some("dest"));
        assert_eq!(by_name("Valor Total").context.as_deref(), Some("ICMSTot"));
        assert_eq!(by_name("Chave NFe").context, None);
    }
}

//! tag maps of resource blocks
//!
//! [extract_tags] understands the shapes a tag attribute is usually written in:
//! - an object literal: `tags = { Owner = "team-a", Env = var.env }`
//! - `merge()` of object literals: `tags = merge({ A = "1" }, { B = local.b })`
//! - repeated tag blocks: `tag { key = "Owner" value = "team-a" }`
//!
//! Values are kept as raw expressions. Anything else (a bare reference, `merge` over
//! references, a conditional, ...) is a [ExtractError::ComplexExpression] the caller
//! may try to resolve as a whole.
use hcl::{Expression, ObjectKey};
use indexmap::IndexMap;

/// Tag key to raw (unresolved) value expression
pub type TagExpressions = IndexMap<String, Expression>;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ExtractError {
    #[error("`{attribute}` is not a literal tag map")]
    ComplexExpression { attribute: String },
    #[error("malformed `{attribute}`: {reason}")]
    Malformed { attribute: String, reason: String },
}

/// Expression of the tag attribute, if the block has one
pub fn tag_attribute<'b>(block: &'b hcl::Block, attribute: &str) -> Option<&'b Expression> {
    block
        .body
        .attributes()
        .find(|attr| attr.key.as_str() == attribute)
        .map(|attr| &attr.expr)
}

/// Extracts `attribute` of `block` as tag key/value expressions
///
/// A block without the attribute yields an empty map.
pub fn extract_tags(block: &hcl::Block, attribute: &str) -> Result<TagExpressions, ExtractError> {
    if let Some(expr) = tag_attribute(block, attribute) {
        return tags_from_expression(expr).map_err(|kind| kind.into_error(attribute));
    }

    let mut tags = TagExpressions::new();
    for tag_block in block
        .body
        .blocks()
        .filter(|b| b.identifier.as_str() == attribute)
    {
        let (key, value) =
            tag_from_block(tag_block).map_err(|kind| kind.into_error(attribute))?;
        tags.insert(key, value);
    }
    Ok(tags)
}

enum Failure {
    Complex,
    Malformed(String),
}

impl Failure {
    fn into_error(self, attribute: &str) -> ExtractError {
        let attribute = attribute.to_string();
        match self {
            Failure::Complex => ExtractError::ComplexExpression { attribute },
            Failure::Malformed(reason) => ExtractError::Malformed { attribute, reason },
        }
    }
}

fn tags_from_expression(expr: &Expression) -> Result<TagExpressions, Failure> {
    match expr {
        Expression::Object(object) => {
            let mut tags = TagExpressions::new();
            for (key, value) in object {
                tags.insert(object_key(key)?, value.clone());
            }
            Ok(tags)
        }
        Expression::Parenthesis(inner) => tags_from_expression(inner),
        Expression::FuncCall(func_call) if func_call.name.to_string() == "merge" => {
            if func_call.expand_final {
                return Err(Failure::Complex);
            }
            let mut tags = TagExpressions::new();
            for arg in &func_call.args {
                if !is_object_literal(arg) {
                    return Err(Failure::Complex);
                }
                // later operands win, like merge() itself
                tags.extend(tags_from_expression(arg)?);
            }
            Ok(tags)
        }
        Expression::Null => Ok(TagExpressions::new()),
        Expression::String(_) | Expression::Number(_) | Expression::Bool(_) | Expression::Array(_) => {
            Err(Failure::Malformed("expected a map of tags".to_string()))
        }
        _ => Err(Failure::Complex),
    }
}

fn is_object_literal(expr: &Expression) -> bool {
    match expr {
        Expression::Object(_) => true,
        Expression::Parenthesis(inner) => is_object_literal(inner),
        _ => false,
    }
}

fn object_key(key: &ObjectKey) -> Result<String, Failure> {
    match key {
        ObjectKey::Identifier(ident) => Ok(ident.as_str().to_string()),
        ObjectKey::Expression(expr) => literal_key(expr).ok_or(Failure::Complex),
        _ => Err(Failure::Complex),
    }
}

fn literal_key(expr: &Expression) -> Option<String> {
    match expr {
        Expression::String(s) => Some(s.clone()),
        Expression::Variable(var) => Some(var.as_str().to_string()),
        Expression::Parenthesis(inner) => literal_key(inner),
        other => match crate::value::Value::from_literal(other)? {
            crate::value::Value::String(s) => Some(s),
            _ => None,
        },
    }
}

fn tag_from_block(block: &hcl::Block) -> Result<(String, Expression), Failure> {
    let mut key = None;
    let mut value = None;
    for attr in block.body.attributes() {
        match attr.key.as_str() {
            "key" => key = Some(&attr.expr),
            "value" => value = Some(&attr.expr),
            _ => {}
        }
    }

    let key = key.ok_or_else(|| Failure::Malformed("tag block without `key`".to_string()))?;
    let key = literal_key(key).ok_or(Failure::Complex)?;
    let value = value
        .cloned()
        .ok_or_else(|| Failure::Malformed(format!("tag block `{key}` without `value`")))?;
    Ok((key, value))
}

/// Display text of a raw tag expression
pub fn raw_text(expr: &Expression) -> String {
    match expr {
        Expression::String(s) => s.clone(),
        other => hcl::format::to_string(other).unwrap_or_else(|_| format!("{other:?}")),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn resource(body: &str) -> hcl::Block {
        let source = format!("resource \"aws_instance\" \"web\" {{\n{body}\n}}");
        let body = hcl::parse(&source).expect("parses");
        body.blocks().next().expect("one block").clone()
    }

    fn keys(tags: &TagExpressions) -> Vec<&str> {
        tags.keys().map(String::as_str).collect()
    }

    #[test]
    fn object_literal() {
        let block = resource(r#"tags = { Environment = "prod", "Cost Center" = var.cc }"#);

        let tags = extract_tags(&block, "tags").expect("extracts");

        assert_eq!(keys(&tags), vec!["Environment", "Cost Center"]);
        assert_eq!(tags["Environment"], Expression::String("prod".into()));
        assert_eq!(raw_text(&tags["Cost Center"]), "var.cc");
    }

    #[test]
    fn merge_of_literals() {
        let block = resource(r#"tags = merge({ A = "1", B = "1" }, { B = "2" })"#);

        let tags = extract_tags(&block, "tags").expect("extracts");

        assert_eq!(keys(&tags), vec!["A", "B"]);
        assert_eq!(tags["B"], Expression::String("2".into()));
    }

    #[test]
    fn complex_expressions() {
        for body in [
            "tags = var.tags",
            "tags = local.common_tags",
            r#"tags = merge(local.common_tags, { Name = "x" })"#,
            r#"tags = var.prod ? { A = "1" } : {}"#,
        ] {
            let result = extract_tags(&resource(body), "tags");
            assert_eq!(
                result,
                Err(ExtractError::ComplexExpression {
                    attribute: "tags".to_string()
                }),
                "{body}"
            );
        }
    }

    #[test]
    fn missing_attribute_is_empty() {
        let tags = extract_tags(&resource(r#"ami = "ami-123""#), "tags").expect("extracts");
        assert!(tags.is_empty());
    }

    #[test]
    fn non_map_is_malformed() {
        let result = extract_tags(&resource(r#"tags = "prod""#), "tags");
        assert!(matches!(result, Err(ExtractError::Malformed { .. })));
    }

    #[test]
    fn tag_blocks() {
        let block = resource(
            r#"
  tag {
    key                 = "Owner"
    value               = "team-a"
    propagate_at_launch = true
  }
  tag {
    key   = "Env"
    value = var.env
  }"#,
        );

        let tags = extract_tags(&block, "tag").expect("extracts");

        assert_eq!(keys(&tags), vec!["Owner", "Env"]);
        assert_eq!(raw_text(&tags["Env"]), "var.env");
    }
}

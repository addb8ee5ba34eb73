//! best-effort evaluation of the expression subset tags are written in
//!
//! Supported: literals, object/array constructors, `var.*` and `local.*` traversals
//! (attribute, index and legacy index access), templates with at most one
//! interpolation and `merge()`. Everything else evaluates to an `Err` carrying the
//! reason it could not be resolved.
use super::SymbolTable;
use crate::{
    reference::{Namespace, Reference},
    value::Value,
};
use hcl::{
    template::{Element, Template},
    Expression, ObjectKey, TemplateExpr, TraversalOperator,
};
use indexmap::IndexMap;
use std::collections::HashMap;

pub(super) type Evaluated = Result<Value, String>;

pub(super) struct Evaluator<'t> {
    table: &'t SymbolTable,
    /// locals evaluated by this evaluator that were not cached in the table yet
    memo: HashMap<String, Evaluated>,
    /// locals currently being evaluated, innermost last
    stack: Vec<String>,
}

impl<'t> Evaluator<'t> {
    pub(super) fn new(table: &'t SymbolTable) -> Self {
        Self {
            table,
            memo: HashMap::new(),
            stack: vec![],
        }
    }

    pub(super) fn eval(&mut self, expr: &Expression) -> Evaluated {
        match expr {
            Expression::String(s) => Ok(s.as_str().into()),
            Expression::Number(n) => Ok(Value::Number(n.clone())),
            Expression::Bool(b) => Ok((*b).into()),
            Expression::Null => Err("Value is null".to_string()),
            Expression::Array(array) => Ok(Value::List(
                array
                    .iter()
                    .map(|element| self.eval_or_raw(element))
                    .collect(),
            )),
            Expression::Object(object) => {
                let mut map = IndexMap::new();
                for (key, value) in object {
                    let key = self.object_key(key)?;
                    map.insert(key, self.eval_or_raw(value));
                }
                Ok(Value::Map(map))
            }
            Expression::TemplateExpr(template_expr) => self.eval_template(template_expr),
            Expression::Traversal(traversal) => {
                let Some(reference) = Reference::from_traversal(traversal) else {
                    return Err("Only var.* and local.* references are resolved".to_string());
                };
                self.eval_reference(&reference)
            }
            Expression::Variable(variable) => Err(format!(
                "Reference `{}` is incomplete",
                variable.as_str()
            )),
            Expression::FuncCall(func_call) if func_call.name.to_string() == "merge" => {
                if func_call.expand_final {
                    return Err("merge() with expanded arguments is not evaluated".to_string());
                }
                self.eval_merge(&func_call.args)
            }
            Expression::FuncCall(func_call) => Err(format!(
                "Function `{}` is not evaluated",
                func_call.name
            )),
            Expression::Parenthesis(inner) => self.eval(inner),
            _ => Err("Expression type is not supported".to_string()),
        }
    }

    /// Evaluates a nested value, keeping failures as [Value::Unresolved]
    fn eval_or_raw(&mut self, expr: &Expression) -> Value {
        self.eval(expr)
            .unwrap_or_else(|_| Value::Unresolved(crate::extract::raw_text(expr)))
    }

    fn object_key(&mut self, key: &ObjectKey) -> Result<String, String> {
        match key {
            ObjectKey::Identifier(ident) => Ok(ident.as_str().to_string()),
            ObjectKey::Expression(Expression::Variable(variable)) => {
                Ok(variable.as_str().to_string())
            }
            ObjectKey::Expression(expr) => self
                .eval(expr)?
                .as_scalar_string()
                .ok_or_else(|| "Object key is not a string".to_string()),
            _ => Err("Object key is not supported".to_string()),
        }
    }

    fn eval_reference(&mut self, reference: &Reference) -> Evaluated {
        let value = match reference.namespace {
            Namespace::Var => self.table.variable_value(reference.name)?,
            Namespace::Local => self.local_value(reference.name)?,
        };
        self.apply_operators(value, reference)
    }

    /// Value of `local.<name>`, from the table cache if it was built already
    #[tracing::instrument(level = "trace", skip(self))]
    pub(super) fn local_value(&mut self, name: &str) -> Evaluated {
        let Some(local) = self.table.locals.get(name) else {
            return Err(format!("Local `{name}` not defined"));
        };
        if let Some(value) = &local.cached_value {
            return Ok(value.clone());
        }
        if let Some(reason) = &local.unresolved_reason {
            return Err(reason.clone());
        }
        if let Some(result) = self.memo.get(name) {
            return result.clone();
        }
        if self.stack.iter().any(|entry| entry == name) {
            let mut cycle = self.stack.clone();
            cycle.push(name.to_string());
            return Err(format!(
                "Reference cycle between locals: {}",
                cycle.join(" -> ")
            ));
        }

        self.stack.push(name.to_string());
        let result = self.eval(&local.expression);
        self.stack.pop();

        tracing::trace!(%name, ?result, "local evaluated");
        self.memo.insert(name.to_string(), result.clone());
        result
    }

    fn apply_operators(&mut self, mut value: Value, reference: &Reference) -> Evaluated {
        for operator in reference.operators {
            value = match operator {
                TraversalOperator::GetAttr(ident) => lookup_key(value, ident.as_str())?,
                TraversalOperator::LegacyIndex(index) => lookup_index(value, *index)?,
                TraversalOperator::Index(index_expr) => {
                    let index = self.eval(index_expr)?;
                    let list_index = match (&value, &index) {
                        (Value::List(_), Value::Number(n)) => Some(
                            n.as_u64()
                                .ok_or_else(|| format!("Invalid list index {n}"))?,
                        ),
                        _ => None,
                    };
                    match (list_index, index.as_scalar_string()) {
                        (Some(list_index), _) => lookup_index(value, list_index)?,
                        (None, Some(key)) => lookup_key(value, &key)?,
                        (None, None) => return Err(format!("Invalid index {index}")),
                    }
                }
                _ => return Err(format!("Splat expressions are not resolved in `{reference}`")),
            };
        }
        Ok(value)
    }

    fn eval_template(&mut self, template_expr: &TemplateExpr) -> Evaluated {
        let template = Template::from_expr(template_expr)
            .map_err(|err| format!("Template could not be parsed: {err}"))?;

        let interpolations = template
            .elements()
            .iter()
            .filter(|element| matches!(element, Element::Interpolation(_)))
            .count();
        if interpolations > 1 {
            return Err("Strings with several interpolations are resolved per reference".to_string());
        }

        if let [Element::Interpolation(interpolation)] = template.elements() {
            return self.eval(&interpolation.expr);
        }

        let mut out = String::new();
        for element in template.elements() {
            match element {
                Element::Literal(literal) => out.push_str(literal),
                Element::Interpolation(interpolation) => {
                    let value = self.eval(&interpolation.expr)?;
                    let text = value.as_scalar_string().ok_or_else(|| {
                        format!("Interpolated value {value} is not a string")
                    })?;
                    out.push_str(&text);
                }
                _ => return Err("Template directives are not resolved".to_string()),
            }
        }
        Ok(out.into())
    }

    fn eval_merge(&mut self, operands: &[Expression]) -> Evaluated {
        let mut merged = IndexMap::new();
        let mut any_resolved = false;

        for operand in operands {
            match self.eval(operand) {
                Ok(Value::Map(map)) => {
                    any_resolved = true;
                    merged.extend(map);
                }
                Ok(other) => {
                    if self.table.strict {
                        return Err(format!("merge() operand {other} is not a map"));
                    }
                    tracing::trace!(operand=%other, "skipping non-map merge operand");
                }
                Err(reason) => {
                    if self.table.strict {
                        return Err(format!("merge() operand could not be resolved: {reason}"));
                    }
                    tracing::trace!(%reason, "skipping merge operand");
                }
            }
        }

        if !any_resolved && !operands.is_empty() {
            return Err("No merge() operand could be resolved".to_string());
        }
        Ok(Value::Map(merged))
    }
}

fn lookup_key(value: Value, key: &str) -> Evaluated {
    match value {
        Value::Map(mut map) => map
            .swap_remove(key)
            .ok_or_else(|| format!("Key `{key}` not found")),
        other => Err(format!("Cannot look up `{key}` in {other}")),
    }
}

fn lookup_index(value: Value, index: u64) -> Evaluated {
    match value {
        Value::List(list) => usize::try_from(index)
            .ok()
            .and_then(|index| list.into_iter().nth(index))
            .ok_or_else(|| format!("Index {index} out of range")),
        other => Err(format!("Cannot index {other}")),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{source_files, symbols::SymbolTableBuilder};
    use pretty_assertions::assert_eq;

    fn eval(table: &SymbolTable, input: &str) -> Evaluated {
        let expr: Expression = input
            .parse::<hcl_edit::expr::Expression>()
            .expect("expression must parse")
            .into();
        Evaluator::new(table).eval(&expr)
    }

    fn table() -> SymbolTable {
        let mut builder = SymbolTableBuilder::new();
        for file in source_files! {
            "main.tf" => r#"
variable "zones" { default = ["a", "b"] }
variable "cfg" {
  default = {
    region = "eu-west-1"
  }
}
locals {
  zone   = var.zones[1]
  legacy = var.zones.0
  region = var.cfg.region
  label  = "${local.region}-x"
}
"#
        } {
            builder.add_source(&file).expect("parses");
        }
        builder.build()
    }

    #[test]
    fn traversal_into_values() {
        let table = table();
        assert_eq!(eval(&table, "local.zone"), Ok(Value::from("b")));
        assert_eq!(eval(&table, "local.legacy"), Ok(Value::from("a")));
        assert_eq!(eval(&table, "local.label"), Ok(Value::from("eu-west-1-x")));
        assert_eq!(
            eval(&table, "var.zones[5]"),
            Err("Index 5 out of range".to_string())
        );
        assert_eq!(
            eval(&table, "var.cfg.zone"),
            Err("Key `zone` not found".to_string())
        );
    }

    #[test]
    fn nested_failures_stay_raw() {
        let table = table();
        assert_eq!(
            eval(&table, r#"{ Region = local.region, Owner = var.owner }"#)
                .map(|value| value.to_string()),
            Ok(r#"{ Region = "eu-west-1", Owner = var.owner }"#.to_string())
        );
    }

    #[test]
    fn splats_are_not_resolved() {
        assert!(eval(&table(), "var.zones[*]").is_err());
    }
}

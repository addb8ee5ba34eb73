//! `var.<name>` / `local.<name>` references inside traversals
use hcl::{Expression, Traversal, TraversalOperator};
use std::fmt::{self, Display, Formatter};

/// The symbol namespace a reference points into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Namespace {
    Var,
    Local,
}

impl Namespace {
    pub fn from_root(root: &str) -> Option<Self> {
        match root {
            "var" => Some(Namespace::Var),
            "local" => Some(Namespace::Local),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::Var => "var",
            Namespace::Local => "local",
        }
    }
}

/// A symbol reference followed by the operators that index into its value
///
/// `local.envs["prod"].name` has namespace [Namespace::Local], name `envs`
/// and the two trailing operators `["prod"]` and `.name`.
#[derive(Debug, Clone, PartialEq)]
pub struct Reference<'t> {
    pub namespace: Namespace,
    pub name: &'t str,
    pub operators: &'t [TraversalOperator],
}

impl<'t> Reference<'t> {
    /// Returns `None` unless the traversal is rooted at `var` or `local`
    /// and its first operator names the symbol.
    pub fn from_traversal(traversal: &'t Traversal) -> Option<Self> {
        let Expression::Variable(root) = &traversal.expr else {
            return None;
        };
        let namespace = Namespace::from_root(root.as_str())?;

        let (TraversalOperator::GetAttr(name), operators) = traversal.operators.split_first()?
        else {
            return None;
        };

        Some(Reference {
            namespace,
            name: name.as_str(),
            operators,
        })
    }

    /// `var.<name>` or `local.<name>` without trailing operators
    pub fn symbol(&self) -> String {
        format!("{}.{}", self.namespace.as_str(), self.name)
    }
}

impl Display for Reference<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.namespace.as_str(), self.name)?;
        for operator in self.operators {
            match operator {
                TraversalOperator::GetAttr(ident) => write!(f, ".{}", ident.as_str())?,
                TraversalOperator::LegacyIndex(index) => write!(f, ".{index}")?,
                TraversalOperator::Index(expr) => match expr {
                    Expression::String(s) => write!(f, "[{s:?}]")?,
                    Expression::Number(n) => write!(f, "[{n}]")?,
                    _ => f.write_str("[...]")?,
                },
                TraversalOperator::AttrSplat => f.write_str(".*")?,
                TraversalOperator::FullSplat => f.write_str("[*]")?,
            }
        }
        Ok(())
    }
}

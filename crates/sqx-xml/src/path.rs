//! Path expressions for locating elements.
//!
//! A small subset of the ElementTree path syntax:
//!
//! - `Tag` or `./Tag`: a direct child
//! - `.//Tag`: a descendant at any depth below the context element
//! - `*`: any tag name
//! - `Tag[@attr='value']`: an attribute equality predicate
//!
//! Steps are joined with `/` (child) or `//` (descendant). The context element
//! itself is never a candidate.

use crate::{XmlElement, XmlNode};
use std::fmt;
use thiserror::Error;

/// Errors from parsing a path expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("empty path expression")]
    Empty,

    #[error("invalid step '{step}' in path '{expression}': {reason}")]
    InvalidStep {
        expression: String,
        step: String,
        reason: &'static str,
    },
}

/// How a step relates to the elements selected by the previous step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Child,
    Descendant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameTest {
    Any,
    Name(String),
}

/// `[@name='value']`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributePredicate {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub axis: Axis,
    pub name: NameTest,
    pub predicate: Option<AttributePredicate>,
}

/// A compiled path expression.
///
/// # Example
///
/// ```rust
/// use sqx_xml::{XmlPath, parse};
///
/// let doc = parse(r#"<Strategy><Build><Params><Param key="A">1</Param></Params></Build></Strategy>"#).unwrap();
/// let path = XmlPath::parse(".//Params/Param[@key='A']").unwrap();
/// assert_eq!(path.find(&doc.root).and_then(|p| p.text()).as_deref(), Some("1"));
///
/// let built = XmlPath::descendant("Params").child("Param").with_attribute("key", "A");
/// assert_eq!(built, path);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlPath {
    steps: Vec<Step>,
}

/// Child-node indices leading from the context element to a match.
pub type NodePath = Vec<usize>;

impl XmlPath {
    /// A path whose first step selects direct children named `name`.
    pub fn child_of_context(name: impl Into<String>) -> Self {
        Self { steps: Vec::new() }.child(name)
    }

    /// A path whose first step selects descendants named `name`.
    pub fn descendant(name: impl Into<String>) -> Self {
        Self { steps: Vec::new() }.push(Axis::Descendant, name.into())
    }

    /// Append a child step.
    pub fn child(self, name: impl Into<String>) -> Self {
        self.push(Axis::Child, name.into())
    }

    /// Append a descendant step.
    pub fn then_descendant(self, name: impl Into<String>) -> Self {
        self.push(Axis::Descendant, name.into())
    }

    /// Add an attribute predicate to the last step.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        if let Some(step) = self.steps.last_mut() {
            step.predicate = Some(AttributePredicate {
                name: name.into(),
                value: value.into(),
            });
        }
        self
    }

    fn push(mut self, axis: Axis, name: String) -> Self {
        let name = if name == "*" {
            NameTest::Any
        } else {
            NameTest::Name(name)
        };
        self.steps.push(Step {
            axis,
            name,
            predicate: None,
        });
        self
    }

    /// Parse a path expression.
    ///
    /// # Errors
    ///
    /// Returns [`PathError`] for empty expressions, empty steps and malformed
    /// predicates.
    pub fn parse(expression: &str) -> Result<Self, PathError> {
        let invalid = |step: &str, reason| PathError::InvalidStep {
            expression: expression.to_string(),
            step: step.to_string(),
            reason,
        };

        let mut rest = expression.strip_prefix('.').unwrap_or(expression);
        if rest.is_empty() {
            return Err(PathError::Empty);
        }

        let mut steps = Vec::new();
        let mut first = true;
        while !rest.is_empty() {
            let axis = if let Some(after) = rest.strip_prefix("//") {
                rest = after;
                Axis::Descendant
            } else if let Some(after) = rest.strip_prefix('/') {
                rest = after;
                Axis::Child
            } else if first {
                Axis::Child
            } else {
                return Err(invalid(rest, "expected '/' between steps"));
            };
            first = false;

            let end = step_end(rest);
            let (text, remaining) = rest.split_at(end);
            rest = remaining;
            steps.push(parse_step(axis, text).map_err(|reason| invalid(text, reason))?);
        }

        Ok(Self { steps })
    }

    /// The steps of this path.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// First matching element in document order.
    pub fn find<'a>(&self, context: &'a XmlElement) -> Option<&'a XmlElement> {
        let first = self.locate(context).into_iter().next()?;
        context.descendant_at(&first)
    }

    /// Mutable access to the first matching element in document order.
    pub fn find_mut<'a>(&self, context: &'a mut XmlElement) -> Option<&'a mut XmlElement> {
        let first = self.locate(context).into_iter().next()?;
        context.descendant_at_mut(&first)
    }

    /// All matching elements in document order.
    pub fn find_all<'a>(&self, context: &'a XmlElement) -> Vec<&'a XmlElement> {
        self.locate(context)
            .iter()
            .filter_map(|path| context.descendant_at(path))
            .collect()
    }

    /// Index paths of all matches, in document order.
    ///
    /// Lexicographic order of child-index paths is document (pre-)order, so
    /// sorting the candidate set after every step keeps results ordered.
    pub fn locate(&self, context: &XmlElement) -> Vec<NodePath> {
        let mut current: Vec<NodePath> = vec![Vec::new()];

        for step in &self.steps {
            let mut next = Vec::new();
            for path in &current {
                let Some(element) = context.descendant_at(path) else {
                    continue;
                };
                match step.axis {
                    Axis::Child => collect_children(element, path, step, &mut next),
                    Axis::Descendant => collect_descendants(element, path, step, &mut next),
                }
            }
            next.sort();
            next.dedup();
            current = next;
        }

        current
    }
}

impl Step {
    /// Whether `element` satisfies this step's name test and predicate.
    pub fn matches(&self, element: &XmlElement) -> bool {
        let name_ok = match &self.name {
            NameTest::Any => true,
            NameTest::Name(name) => element.name == *name,
        };
        name_ok
            && self
                .predicate
                .as_ref()
                .is_none_or(|p| element.attribute(&p.name) == Some(p.value.as_str()))
    }
}

impl fmt::Display for XmlPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ".")?;
        for step in &self.steps {
            match step.axis {
                Axis::Child => write!(f, "/")?,
                Axis::Descendant => write!(f, "//")?,
            }
            match &step.name {
                NameTest::Any => write!(f, "*")?,
                NameTest::Name(name) => write!(f, "{name}")?,
            }
            if let Some(predicate) = &step.predicate {
                write!(f, "[@{}='{}']", predicate.name, predicate.value)?;
            }
        }
        Ok(())
    }
}

fn collect_children(element: &XmlElement, path: &[usize], step: &Step, out: &mut Vec<NodePath>) {
    for (index, node) in element.children.iter().enumerate() {
        if let XmlNode::Element(child) = node {
            if step.matches(child) {
                let mut child_path = path.to_vec();
                child_path.push(index);
                out.push(child_path);
            }
        }
    }
}

fn collect_descendants(
    element: &XmlElement,
    path: &[usize],
    step: &Step,
    out: &mut Vec<NodePath>,
) {
    for (index, node) in element.children.iter().enumerate() {
        if let XmlNode::Element(child) = node {
            let mut child_path = path.to_vec();
            child_path.push(index);
            if step.matches(child) {
                out.push(child_path.clone());
            }
            collect_descendants(child, &child_path, step, out);
        }
    }
}

/// Byte offset where the current step ends: the next `/` outside a predicate.
fn step_end(rest: &str) -> usize {
    let mut quote: Option<char> = None;
    let mut depth = 0usize;
    for (pos, c) in rest.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.saturating_sub(1),
            (None, '/') if depth == 0 => return pos,
            _ => {}
        }
    }
    rest.len()
}

fn parse_step(axis: Axis, text: &str) -> Result<Step, &'static str> {
    let (name, predicate) = match text.find('[') {
        Some(open) => (&text[..open], Some(&text[open..])),
        None => (text, None),
    };
    if name.is_empty() {
        return Err("missing tag name");
    }

    let predicate = predicate.map(parse_predicate).transpose()?;
    let name = if name == "*" {
        NameTest::Any
    } else {
        NameTest::Name(name.to_string())
    };

    Ok(Step {
        axis,
        name,
        predicate,
    })
}

fn parse_predicate(text: &str) -> Result<AttributePredicate, &'static str> {
    let inner = text
        .strip_prefix("[@")
        .and_then(|t| t.strip_suffix(']'))
        .ok_or("predicate must look like [@name='value']")?;
    let (name, quoted) = inner
        .split_once('=')
        .ok_or("predicate is missing '='")?;
    let quoted = quoted.trim();
    let value = quoted
        .strip_prefix('\'')
        .and_then(|v| v.strip_suffix('\''))
        .or_else(|| quoted.strip_prefix('"').and_then(|v| v.strip_suffix('"')))
        .ok_or("predicate value must be quoted")?;

    Ok(AttributePredicate {
        name: name.trim().to_string(),
        value: value.to_string(),
    })
}

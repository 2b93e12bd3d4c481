use crate::dom::{Dom, NodeId};
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AttrCondition {
    Exists { key: String },
    Eq { key: String, value: String },
    StartsWith { key: String, value: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct SelectorStep {
    pub(crate) tag: Option<String>,
    pub(crate) id: Option<String>,
    pub(crate) classes: Vec<String>,
    pub(crate) attrs: Vec<AttrCondition>,
}

impl SelectorStep {
    fn is_empty(&self) -> bool {
        self.tag.is_none() && self.id.is_none() && self.classes.is_empty() && self.attrs.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SelectorPart {
    pub(crate) step: SelectorStep,
    // Relation to the previous (left) selector part.
    pub(crate) combinator: Option<Combinator>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Selector {
    parts: Vec<SelectorPart>,
}

impl Selector {
    pub(crate) fn parse(source: &str) -> Result<Self> {
        let trimmed = source.trim();
        if trimmed.is_empty() {
            return Err(Error::UnsupportedSelector(source.to_string()));
        }

        let mut parts = Vec::new();
        let mut pending_combinator: Option<Combinator> = None;
        let mut chars = trimmed.chars().peekable();

        while chars.peek().is_some() {
            while chars.peek().is_some_and(|ch| ch.is_whitespace()) {
                chars.next();
                if pending_combinator.is_none() && !parts.is_empty() {
                    pending_combinator = Some(Combinator::Descendant);
                }
            }
            if chars.peek() == Some(&'>') {
                chars.next();
                if parts.is_empty() {
                    return Err(Error::UnsupportedSelector(source.to_string()));
                }
                pending_combinator = Some(Combinator::Child);
                while chars.peek().is_some_and(|ch| ch.is_whitespace()) {
                    chars.next();
                }
            }
            if chars.peek().is_none() {
                break;
            }

            let mut step = SelectorStep::default();
            loop {
                match chars.peek().copied() {
                    Some('#') => {
                        chars.next();
                        step.id = Some(read_ident(&mut chars, source)?);
                    }
                    Some('.') => {
                        chars.next();
                        step.classes.push(read_ident(&mut chars, source)?);
                    }
                    Some('[') => {
                        chars.next();
                        step.attrs.push(read_attr_condition(&mut chars, source)?);
                    }
                    Some('*') => {
                        chars.next();
                    }
                    Some(ch) if ch.is_ascii_alphanumeric() || ch == '-' => {
                        let tag = read_ident(&mut chars, source)?;
                        step.tag = Some(tag.to_ascii_lowercase());
                    }
                    Some(ch) if ch.is_whitespace() || ch == '>' => break,
                    Some(_) => return Err(Error::UnsupportedSelector(source.to_string())),
                    None => break,
                }
                match chars.peek() {
                    Some(ch) if ch.is_whitespace() || *ch == '>' => break,
                    None => break,
                    _ => {}
                }
            }

            if step.is_empty() {
                return Err(Error::UnsupportedSelector(source.to_string()));
            }
            parts.push(SelectorPart {
                step,
                combinator: pending_combinator.take(),
            });
        }

        if parts.is_empty() || pending_combinator.is_some() {
            return Err(Error::UnsupportedSelector(source.to_string()));
        }
        Ok(Self { parts })
    }

    /// All matching elements under `scope`, in document order.
    pub(crate) fn query_all(&self, dom: &Dom, scope: NodeId) -> Vec<NodeId> {
        dom.descendant_elements(scope)
            .into_iter()
            .filter(|id| self.matches(dom, *id, scope))
            .collect()
    }

    fn matches(&self, dom: &Dom, id: NodeId, scope: NodeId) -> bool {
        let last = self.parts.len() - 1;
        if !step_matches(dom, id, &self.parts[last].step) {
            return false;
        }
        self.match_left(dom, id, scope, last)
    }

    fn match_left(&self, dom: &Dom, id: NodeId, scope: NodeId, part_index: usize) -> bool {
        let Some(combinator) = self.parts[part_index].combinator else {
            return true;
        };
        let prev = part_index - 1;
        match combinator {
            Combinator::Child => {
                let Some(parent) = dom.node(id).parent else {
                    return false;
                };
                if parent == scope {
                    return false;
                }
                step_matches(dom, parent, &self.parts[prev].step)
                    && self.match_left(dom, parent, scope, prev)
            }
            Combinator::Descendant => {
                let mut current = dom.node(id).parent;
                while let Some(ancestor) = current {
                    if ancestor == scope {
                        break;
                    }
                    if step_matches(dom, ancestor, &self.parts[prev].step)
                        && self.match_left(dom, ancestor, scope, prev)
                    {
                        return true;
                    }
                    current = dom.node(ancestor).parent;
                }
                false
            }
        }
    }
}

fn step_matches(dom: &Dom, id: NodeId, step: &SelectorStep) -> bool {
    let Some(element) = dom.element(id) else {
        return false;
    };
    if let Some(tag) = &step.tag {
        if element.tag_name != *tag {
            return false;
        }
    }
    if let Some(wanted) = &step.id {
        if element.attrs.get("id") != Some(wanted) {
            return false;
        }
    }
    for class in &step.classes {
        if !dom.has_class(id, class) {
            return false;
        }
    }
    for condition in &step.attrs {
        let matched = match condition {
            AttrCondition::Exists { key } => element.attrs.contains_key(key),
            AttrCondition::Eq { key, value } => {
                element.attrs.get(key).map(String::as_str) == Some(value.as_str())
            }
            AttrCondition::StartsWith { key, value } => element
                .attrs
                .get(key)
                .is_some_and(|attr| !value.is_empty() && attr.starts_with(value.as_str())),
        };
        if !matched {
            return false;
        }
    }
    true
}

fn read_ident(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    source: &str,
) -> Result<String> {
    let mut out = String::new();
    while chars
        .peek()
        .is_some_and(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_'))
    {
        out.push(chars.next().unwrap_or_default());
    }
    if out.is_empty() {
        return Err(Error::UnsupportedSelector(source.to_string()));
    }
    Ok(out)
}

fn read_attr_condition(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    source: &str,
) -> Result<AttrCondition> {
    let mut key = String::new();
    while chars
        .peek()
        .is_some_and(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | ':'))
    {
        key.push(chars.next().unwrap_or_default());
    }
    if key.is_empty() {
        return Err(Error::UnsupportedSelector(source.to_string()));
    }

    match chars.next() {
        Some(']') => Ok(AttrCondition::Exists { key }),
        Some('=') => {
            let value = read_attr_value(chars, source)?;
            Ok(AttrCondition::Eq { key, value })
        }
        Some('^') => {
            if chars.next() != Some('=') {
                return Err(Error::UnsupportedSelector(source.to_string()));
            }
            let value = read_attr_value(chars, source)?;
            Ok(AttrCondition::StartsWith { key, value })
        }
        _ => Err(Error::UnsupportedSelector(source.to_string())),
    }
}

fn read_attr_value(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    source: &str,
) -> Result<String> {
    let mut value = String::new();
    match chars.peek().copied() {
        Some(quote @ ('"' | '\'')) => {
            chars.next();
            loop {
                match chars.next() {
                    Some(ch) if ch == quote => break,
                    Some(ch) => value.push(ch),
                    None => return Err(Error::UnsupportedSelector(source.to_string())),
                }
            }
            if chars.next() != Some(']') {
                return Err(Error::UnsupportedSelector(source.to_string()));
            }
        }
        _ => loop {
            match chars.next() {
                Some(']') => break,
                Some(ch) => value.push(ch),
                None => return Err(Error::UnsupportedSelector(source.to_string())),
            }
        },
    }
    Ok(value)
}

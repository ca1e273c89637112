//! Minimal logic-less mustache engine
//!
//! Supports variables (escaped and raw), dotted names, the implicit iterator
//! `{{.}}`, sections, inverted sections and comments. Partials, lambdas and
//! delimiter changes are not supported.
//!
//! Section, closing and comment tags that sit alone on a line take the whole
//! line with them, so block templates render without stray blank lines.

use serde_json::Value;

#[derive(Debug, PartialEq)]
enum Node {
    Text(String),
    Var { name: String, escape: bool },
    Section { name: String, inverted: bool, children: Vec<Node> },
}

struct OpenSection {
    name: String,
    inverted: bool,
    parent: Vec<Node>,
}

/// Render `source` against `state`
pub(crate) fn render(source: &str, state: &Value) -> Result<String, String> {
    let nodes = compile(source)?;
    let mut out = String::with_capacity(source.len());
    let mut stack = vec![state];
    render_nodes(&nodes, &mut stack, &mut out);
    Ok(out)
}

fn compile(source: &str) -> Result<Vec<Node>, String> {
    let mut open: Vec<OpenSection> = Vec::new();
    let mut current: Vec<Node> = Vec::new();
    let mut rest = source;
    let mut at_line_start = true;

    while let Some(start) = rest.find("{{") {
        let before = &rest[..start];
        let after = &rest[start + 2..];

        if let Some(inner) = after.strip_prefix('{') {
            let end = inner
                .find("}}}")
                .ok_or_else(|| "unclosed tag `{{{`".to_string())?;
            push_text(&mut current, before);
            current.push(Node::Var {
                name: inner[..end].trim().to_string(),
                escape: false,
            });
            rest = &inner[end + 3..];
            at_line_start = false;
            continue;
        }

        let end = after
            .find("}}")
            .ok_or_else(|| "unclosed tag `{{`".to_string())?;
        let tag = after[..end].trim();
        let tail = &after[end + 2..];

        let standalone_line = if matches!(tag.chars().next(), Some('!' | '#' | '^' | '/')) {
            standalone(before, at_line_start, tail)
        } else {
            None
        };
        match standalone_line {
            Some((indent_start, line_end)) => {
                push_text(&mut current, &before[..indent_start]);
                rest = &tail[line_end..];
                at_line_start = true;
            }
            None => {
                push_text(&mut current, before);
                rest = tail;
                at_line_start = false;
            }
        }

        let mut chars = tag.chars();
        match chars.next() {
            Some('!') => {}
            Some(sigil @ ('#' | '^')) => open.push(OpenSection {
                name: chars.as_str().trim().to_string(),
                inverted: sigil == '^',
                parent: std::mem::take(&mut current),
            }),
            Some('/') => {
                let name = chars.as_str().trim();
                let section = open
                    .pop()
                    .ok_or_else(|| format!("closing tag `{name}` without an open section"))?;
                if section.name != name {
                    return Err(format!("section `{}` closed by `{name}`", section.name));
                }
                let children = std::mem::replace(&mut current, section.parent);
                current.push(Node::Section {
                    name: section.name,
                    inverted: section.inverted,
                    children,
                });
            }
            Some('&') => current.push(Node::Var {
                name: chars.as_str().trim().to_string(),
                escape: false,
            }),
            Some(_) => current.push(Node::Var {
                name: tag.to_string(),
                escape: true,
            }),
            None => return Err("empty tag".to_string()),
        }
    }

    push_text(&mut current, rest);
    if let Some(section) = open.pop() {
        return Err(format!("unclosed section `{}`", section.name));
    }
    Ok(current)
}

fn push_text(nodes: &mut Vec<Node>, text: &str) {
    if !text.is_empty() {
        nodes.push(Node::Text(text.to_string()));
    }
}

/// Where the line holding a tag starts in `before` and ends in `tail`, if
/// the tag has only blanks around it on that line
fn standalone(before: &str, at_line_start: bool, tail: &str) -> Option<(usize, usize)> {
    let is_blank = |text: &str| text.chars().all(|c| c == ' ' || c == '\t');

    let indent_start = match before.rfind('\n') {
        Some(newline) => newline + 1,
        None if at_line_start => 0,
        None => return None,
    };
    let line_end = tail.find('\n').map_or(tail.len(), |newline| newline + 1);

    let trailing = tail[..line_end].trim_end_matches(['\r', '\n']);
    (is_blank(&before[indent_start..]) && is_blank(trailing)).then_some((indent_start, line_end))
}

fn render_nodes<'a>(nodes: &[Node], stack: &mut Vec<&'a Value>, out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Var { name, escape } => {
                if let Some(value) = lookup(name, stack) {
                    let text = to_text(value);
                    if *escape {
                        escape_html(&text, out);
                    } else {
                        out.push_str(&text);
                    }
                }
            }
            Node::Section {
                name,
                inverted,
                children,
            } => {
                let value = lookup(name, stack);
                if *inverted {
                    if !value.is_some_and(is_truthy) {
                        render_nodes(children, stack, out);
                    }
                    continue;
                }
                match value {
                    Some(Value::Array(items)) => {
                        for item in items {
                            stack.push(item);
                            render_nodes(children, stack, out);
                            stack.pop();
                        }
                    }
                    Some(value) if is_truthy(value) => {
                        stack.push(value);
                        render_nodes(children, stack, out);
                        stack.pop();
                    }
                    _ => {}
                }
            }
        }
    }
}

fn lookup<'a>(name: &str, stack: &[&'a Value]) -> Option<&'a Value> {
    if name == "." {
        return stack.last().copied();
    }
    let mut parts = name.split('.');
    let first = parts.next()?;
    let mut value = stack.iter().rev().find_map(|scope| (*scope).get(first))?;
    for part in parts {
        value = value.get(part)?;
    }
    Some(value)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(_) => true,
    }
}

fn to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn escape_html(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
}

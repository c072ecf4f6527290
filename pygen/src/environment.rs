use std::collections::{BTreeSet, HashMap};

use pyblocks::EditorSession;

pub const INDENT: &str = "    ";

const KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global",
    "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return",
    "try", "while", "with", "yield",
];

const BUILTINS: &[&str] = &[
    "abs", "all", "any", "bool", "dict", "enumerate", "filter", "float", "id", "input", "int",
    "len", "list", "map", "max", "min", "object", "open", "print", "range", "round", "set",
    "sorted", "str", "sum", "tuple", "type", "zip",
];

/// Python names of workspace variables.
///
/// Every variable named anywhere in the workspace is hoisted to the top of the program,
/// so reading a variable before its first assignment yields `None` rather than a
/// `NameError`.
#[derive(Debug, Default)]
pub struct Environment {
    /// Workspace name to Python name, in first-seen order.
    hoisted: Vec<(String, String)>,
    names: HashMap<String, String>,
    /// Names that must not be taken by a variable, such as imported modules.
    reserved: BTreeSet<String>,
}

impl Environment {
    pub fn new(reserved: impl IntoIterator<Item = String>) -> Self {
        Environment {
            reserved: reserved.into_iter().collect(),
            ..Environment::default()
        }
    }

    /// Collect every variable field value in the workspace.
    pub fn collect(session: &EditorSession, reserved: impl IntoIterator<Item = String>) -> Self {
        let mut env = Environment::new(reserved);
        for top in session.top_blocks_ordered() {
            for id in session.descendants(top) {
                let Some(block) = session.block(id) else {
                    continue;
                };
                for (field, value) in &block.fields {
                    if block.kind.is_variable_field(field) {
                        env.declare(value);
                    }
                }
            }
        }
        env
    }

    /// Register a variable and return its Python name.
    pub fn declare(&mut self, name: &str) -> String {
        if let Some(existing) = self.names.get(name) {
            return existing.clone();
        }
        let base = sanitize(name);
        let mut candidate = base.clone();
        let mut n = 2;
        while self.reserved.contains(&candidate) || self.hoisted.iter().any(|(_, p)| *p == candidate) {
            candidate = format!("{}{}", base, n);
            n += 1;
        }
        self.names.insert(name.to_string(), candidate.clone());
        self.hoisted.push((name.to_string(), candidate.clone()));
        candidate
    }

    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.names.get(name).map(|s| s.as_str())
    }

    /// `name = None` lines for every hoisted variable.
    pub fn declarations(&self) -> Vec<String> {
        self.hoisted
            .iter()
            .map(|(_, python)| format!("{} = None", python))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.hoisted.is_empty()
    }
}

/// Turn an arbitrary label into a Python identifier that shadows nothing.
pub fn sanitize(name: &str) -> String {
    let mut out: String = name
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    if KEYWORDS.contains(&out.as_str()) || BUILTINS.contains(&out.as_str()) {
        out.push('_');
    }
    out
}

pub fn indent(code: &str) -> String {
    code.lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{}{}", INDENT, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Python literal for a string, in `repr` style with single quotes.
pub fn repr(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('\'');
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

use std::collections::BTreeSet;

use tracing::debug;

use pyblocks::block::catalog::order;
use pyblocks::block::kind::InputKind;
use pyblocks::{BlockId, ConnectionId, EditorSession};

use crate::environment::{Environment, indent, repr};
use crate::error::{GenDiagnostic, GenError};
use crate::template::{self, Segment};

/// Generated program text plus the advisory problems found on the way.
#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    pub code: String,
    pub warnings: Vec<GenDiagnostic>,
}

/// Generate Python for every top-level tree of a resynced session.
pub fn generate(session: &EditorSession) -> Result<Output, GenError> {
    Generator::new(session).program()
}

/// Whether a child expression of precedence `child` needs parentheses in a slot of a
/// parent with precedence `own`.
pub fn needs_parens(own: u8, child: u8, right: bool) -> bool {
    if child > own {
        return true;
    }
    if child < own || child == order::ATOMIC || child == order::MEMBER {
        return false;
    }
    // Comparisons chain in Python, so `(a < b) == c` must keep its parentheses.
    if own == order::RELATIONAL {
        return true;
    }
    if own == order::EXPONENTIATION {
        !right
    } else {
        right
    }
}

pub struct Generator<'a> {
    session: &'a EditorSession,
    imports: BTreeSet<String>,
    env: Environment,
    warnings: Vec<GenDiagnostic>,
}

impl<'a> Generator<'a> {
    pub fn new(session: &'a EditorSession) -> Self {
        let imports: BTreeSet<String> = session
            .blocks()
            .flat_map(|b| b.kind.imports.iter().cloned())
            .collect();
        let env = Environment::collect(session, imports.iter().cloned());
        Generator {
            session,
            imports,
            env,
            warnings: Vec::new(),
        }
    }

    pub fn program(mut self) -> Result<Output, GenError> {
        let mut body = Vec::new();
        for top in self.session.top_blocks_ordered() {
            let Some(block) = self.session.block(top) else {
                continue;
            };
            let code = if block.is_expression() {
                self.expression(top)?.0
            } else {
                self.chain(top)?
            };
            body.push(code);
        }

        let mut sections = Vec::new();
        if !self.imports.is_empty() {
            sections.push(
                self.imports
                    .iter()
                    .map(|m| format!("import {}", m))
                    .collect::<Vec<_>>()
                    .join("\n"),
            );
        }
        if !self.env.is_empty() {
            sections.push(self.env.declarations().join("\n"));
        }
        if !body.is_empty() {
            sections.push(body.join("\n"));
        }
        let mut code = sections.join("\n\n");
        if !code.is_empty() {
            code.push('\n');
        }
        debug!(lines = code.lines().count(), warnings = self.warnings.len(), "generated python");
        Ok(Output {
            code,
            warnings: self.warnings,
        })
    }

    fn attached(&self, connection: Option<ConnectionId>) -> Option<BlockId> {
        let target = self.session.connection(connection?)?.target?;
        Some(self.session.connection(target)?.block)
    }

    /// Code of a statement chain, one statement after another.
    pub fn chain(&mut self, head: BlockId) -> Result<String, GenError> {
        let mut lines = Vec::new();
        let mut cur = Some(head);
        while let Some(id) = cur {
            lines.push(self.fill(id)?);
            cur = self.session.next_block(id);
        }
        Ok(lines.join("\n"))
    }

    /// Code of an expression and the precedence of its outermost operator.
    pub fn expression(&mut self, id: BlockId) -> Result<(String, u8), GenError> {
        let precedence = self
            .session
            .block(id)
            .ok_or(GenError::UnknownBlock(id))?
            .kind
            .precedence;
        Ok((self.fill(id)?, precedence))
    }

    fn fill(&mut self, id: BlockId) -> Result<String, GenError> {
        let session = self.session;
        let block = session.block(id).ok_or(GenError::UnknownBlock(id))?;
        let kind = &block.kind;
        if block.type_vecs.is_empty() {
            self.warnings.push(GenDiagnostic::warning(
                GenError::Unsatisfiable {
                    block: id,
                    kind: kind.name.clone(),
                },
                id,
            ));
        }
        let segments = template::parse(&kind.python).ok_or_else(|| GenError::UnterminatedPlaceholder {
            kind: kind.name.clone(),
        })?;

        let mut out = String::new();
        for segment in segments {
            match segment {
                Segment::Text(text) => out.push_str(&text),
                Segment::Spread => {
                    let mut items = Vec::new();
                    for input in block.inputs.iter().filter(|i| i.kind == InputKind::Value) {
                        if let Some(child) = self.attached(input.connection) {
                            items.push(self.expression(child)?.0);
                        }
                    }
                    out.push_str(&items.join(", "));
                }
                Segment::Slot {
                    name,
                    repr: quoted,
                    depth,
                    right,
                } => {
                    if let Some(input) = block.input(&name) {
                        match input.kind {
                            InputKind::Value => match self.attached(input.connection) {
                                Some(child) => {
                                    let (code, precedence) = self.expression(child)?;
                                    if depth == 0 && needs_parens(kind.precedence, precedence, right) {
                                        out.push('(');
                                        out.push_str(&code);
                                        out.push(')');
                                    } else {
                                        out.push_str(&code);
                                    }
                                }
                                None => {
                                    self.warnings.push(GenDiagnostic::warning(
                                        GenError::EmptyHole {
                                            block: id,
                                            input: name.clone(),
                                        },
                                        id,
                                    ));
                                    out.push_str("None");
                                }
                            },
                            InputKind::Statement => {
                                let suite = match self.attached(input.connection) {
                                    Some(child) => self.chain(child)?,
                                    None => "pass".to_string(),
                                };
                                out.push_str(&indent(&suite));
                            }
                            InputKind::Dummy => {
                                return Err(GenError::UnknownPlaceholder {
                                    kind: kind.name.clone(),
                                    placeholder: name,
                                });
                            }
                        }
                    } else if let Some(value) = block.field(&name) {
                        if quoted {
                            out.push_str(&repr(value));
                        } else if kind.is_variable_field(&name) {
                            let python = self.env.declare(value);
                            out.push_str(&python);
                        } else {
                            out.push_str(value);
                        }
                    } else {
                        return Err(GenError::UnknownPlaceholder {
                            kind: kind.name.clone(),
                            placeholder: name,
                        });
                    }
                }
            }
        }
        Ok(out)
    }
}

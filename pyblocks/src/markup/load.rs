//! Building blocks from a saved workspace while it is read.
//!
//! The document is consumed as a stream of `quick-xml` events. Each open element is one
//! [`Frame`] on an explicit stack, so nesting depth (every `<next>` adds a level) never
//! turns into call depth.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::ops::Range;

use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use tracing::{debug, warn};

use crate::block::BlockId;
use crate::markup::error::ParseError;
use crate::session::{EditorError, EditorSession};

/// Result of a successful load.
#[derive(Debug, Default)]
pub struct Loaded {
    /// Top-level blocks in document order.
    pub blocks: Vec<BlockId>,
    /// Elements and attributes that were skipped.
    pub warnings: Vec<ParseError>,
    /// Opening tag of every loaded block, for pointing diagnostics at the source.
    pub spans: BTreeMap<BlockId, Range<usize>>,
    /// Blocks by their `id` attribute.
    pub names: BTreeMap<String, BlockId>,
}

struct Attribute {
    name: String,
    value: String,
    span: Range<usize>,
}

/// A start tag with decoded attributes.
struct Tag {
    name: String,
    attributes: Vec<Attribute>,
    span: Range<usize>,
}

impl Tag {
    fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

/// Which block input a `<value>`, `<statement>` or `<next>` element fills.
enum Link {
    Value(String),
    Statement(String),
    Next,
}

/// What an open element means to the loader.
enum Frame {
    Workspace,
    Block {
        id: BlockId,
        id_attribute: Option<(String, Range<usize>)>,
    },
    Field {
        block: BlockId,
        name: String,
        text: String,
    },
    Link {
        block: BlockId,
        link: Link,
        child: Option<BlockId>,
    },
    /// Skipped content, including everything below a block that failed to load.
    Ignored,
}

struct Open {
    name: String,
    span: Range<usize>,
    frame: Frame,
}

/// Where a new element lands.
enum Context {
    Document,
    Workspace,
    Block(BlockId),
    Link { element: String, filled: bool },
    Inert,
}

struct Loader<'a, 's> {
    source: &'s str,
    file_id: usize,
    session: &'a mut EditorSession,
    open: Vec<Open>,
    seen_root: bool,
    /// Blocks created for the top-level block being read, in creation order.
    pending: Vec<BlockId>,
    blocks: Vec<BlockId>,
    warnings: Vec<ParseError>,
    errors: Vec<ParseError>,
    spans: BTreeMap<BlockId, Range<usize>>,
    names: BTreeMap<String, BlockId>,
}

/// Build the blocks described by `source` into `session`.
///
/// Types are resynchronised once, after the whole document is in place. A block that
/// fails to load is reported and reading continues with the next top-level block, but any
/// error fails the load as a whole and nothing is left behind in the session.
pub fn load(source: &str, file_id: usize, session: &mut EditorSession) -> Result<Loaded, Vec<ParseError>> {
    let mut reader = Reader::from_str(source);
    // End tags are matched against the frame stack so mismatches can point at both tags.
    reader.config_mut().check_end_names = false;

    session.defer_resync();
    let mut loader = Loader {
        source,
        file_id,
        session: &mut *session,
        open: Vec::new(),
        seen_root: false,
        pending: Vec::new(),
        blocks: Vec::new(),
        warnings: Vec::new(),
        errors: Vec::new(),
        spans: BTreeMap::new(),
        names: BTreeMap::new(),
    };
    if let Err(fatal) = loader.run(&mut reader) {
        loader.errors.push(fatal);
    }
    if !loader.errors.is_empty() {
        loader.discard_pending();
        for id in std::mem::take(&mut loader.blocks) {
            loader.discard(id);
        }
        let errors = std::mem::take(&mut loader.errors);
        session.resume_resync();
        return Err(errors);
    }

    let Loader {
        blocks,
        warnings,
        spans,
        names,
        ..
    } = loader;
    session.resume_resync();
    debug!(blocks = blocks.len(), warnings = warnings.len(), "loaded workspace");
    Ok(Loaded {
        blocks,
        warnings,
        spans,
        names,
    })
}

/// Byte offset of `part` in `source`, when `part` is a slice of it.
fn offset_in(source: &str, part: &[u8]) -> Option<usize> {
    let start = (part.as_ptr() as usize).checked_sub(source.as_ptr() as usize)?;
    (start + part.len() <= source.len()).then_some(start)
}

impl Loader<'_, '_> {
    fn run(&mut self, reader: &mut Reader<&[u8]>) -> Result<(), ParseError> {
        loop {
            let start = reader.buffer_position() as usize;
            let event = match reader.read_event() {
                Ok(event) => event,
                Err(e) => {
                    let at = reader.error_position() as usize;
                    let end = (reader.buffer_position() as usize).max(at);
                    return Err(self.error(e.to_string(), at..end));
                }
            };
            let end = reader.buffer_position() as usize;
            match event {
                Event::Start(e) => {
                    let tag = self.tag(&e, start..end)?;
                    self.open(tag)?;
                }
                Event::Empty(e) => {
                    let tag = self.tag(&e, start..end)?;
                    let name = tag.name.clone();
                    self.open(tag)?;
                    self.close(&name, start..end)?;
                }
                Event::End(e) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    self.close(&name, start..end)?;
                }
                Event::Text(_) => self.text(start..end)?,
                Event::Eof => return self.finish(),
                _ => {}
            }
        }
    }

    fn error(&self, message: impl Into<String>, span: Range<usize>) -> ParseError {
        ParseError::error(message, span, self.file_id)
    }

    fn structural(&self, error: EditorError, span: &Range<usize>) -> ParseError {
        self.error(error.to_string(), span.clone())
    }

    fn tag(&self, start: &BytesStart<'_>, span: Range<usize>) -> Result<Tag, ParseError> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut attributes: Vec<Attribute> = Vec::new();
        for attribute in start.attributes().with_checks(false) {
            let attribute = attribute
                .map_err(|e| self.error(format!("malformed attribute: {}", e), span.clone()))?;
            let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
            let located = offset_in(self.source, attribute.key.as_ref())
                .zip(offset_in(self.source, &attribute.value));
            let (raw, attribute_span) = match located {
                Some((key_at, value_at)) => {
                    let value_end = value_at + attribute.value.len();
                    // The span runs to the closing quote.
                    (Cow::Borrowed(&self.source[value_at..value_end]), key_at..value_end + 1)
                }
                None => (String::from_utf8_lossy(&attribute.value), span.clone()),
            };
            let value = unescape(&raw)
                .map_err(|e| self.error(format!("cannot decode attribute '{}': {}", key, e), attribute_span.clone()))?
                .into_owned();
            if let Some(previous) = attributes.iter().find(|a| a.name == key) {
                return Err(self
                    .error(format!("duplicate attribute '{}'", key), attribute_span)
                    .with_related(previous.span.clone(), "first given here"));
            }
            attributes.push(Attribute {
                name: key,
                value,
                span: attribute_span,
            });
        }
        Ok(Tag {
            name,
            attributes,
            span,
        })
    }

    fn context(&self) -> Context {
        let Some(open) = self.open.last() else {
            return Context::Document;
        };
        match &open.frame {
            Frame::Workspace => Context::Workspace,
            Frame::Block { id, .. } => Context::Block(*id),
            Frame::Link { child, .. } => Context::Link {
                element: open.name.clone(),
                filled: child.is_some(),
            },
            Frame::Field { .. } | Frame::Ignored => Context::Inert,
        }
    }

    fn open(&mut self, tag: Tag) -> Result<(), ParseError> {
        let frame = match self.context() {
            Context::Document => self.root(&tag)?,
            context => self.enter(context, &tag).unwrap_or_else(|error| {
                self.fail(error);
                Frame::Ignored
            }),
        };
        self.open.push(Open {
            name: tag.name,
            span: tag.span,
            frame,
        });
        Ok(())
    }

    fn root(&mut self, tag: &Tag) -> Result<Frame, ParseError> {
        if self.seen_root {
            return Err(self.error("content after the root element", tag.span.clone()));
        }
        if tag.name != "xml" {
            return Err(self
                .error(
                    format!("expected an <xml> root element, found <{}>", tag.name),
                    tag.span.clone(),
                )
                .with_note("saved workspaces start with <xml>"));
        }
        self.seen_root = true;
        Ok(Frame::Workspace)
    }

    fn enter(&mut self, context: Context, tag: &Tag) -> Result<Frame, ParseError> {
        match context {
            Context::Workspace if tag.name == "block" => self.block(tag, true),
            Context::Block(id) => match tag.name.as_str() {
                "mutation" => {
                    self.mutation(id, tag)?;
                    Ok(Frame::Ignored)
                }
                "field" => Ok(Frame::Field {
                    block: id,
                    name: self.name_of(tag)?,
                    text: String::new(),
                }),
                "value" => Ok(Frame::Link {
                    block: id,
                    link: Link::Value(self.name_of(tag)?),
                    child: None,
                }),
                "statement" => Ok(Frame::Link {
                    block: id,
                    link: Link::Statement(self.name_of(tag)?),
                    child: None,
                }),
                "next" => Ok(Frame::Link {
                    block: id,
                    link: Link::Next,
                    child: None,
                }),
                _ => Ok(self.skip(tag)),
            },
            Context::Link { element, filled } if tag.name == "block" || tag.name == "shadow" => {
                if filled {
                    return Err(self.error(
                        format!("<{}> holds more than one block", element),
                        tag.span.clone(),
                    ));
                }
                self.block(tag, false)
            }
            Context::Workspace | Context::Link { .. } => Ok(self.skip(tag)),
            Context::Document | Context::Inert => Ok(Frame::Ignored),
        }
    }

    fn skip(&mut self, tag: &Tag) -> Frame {
        self.warnings.push(ParseError::warning(
            format!("ignoring unexpected <{}> element", tag.name),
            tag.span.clone(),
            self.file_id,
        ));
        Frame::Ignored
    }

    fn block(&mut self, tag: &Tag, top: bool) -> Result<Frame, ParseError> {
        let Some(kind) = tag.attribute("type") else {
            return Err(self.error("block is missing its 'type' attribute", tag.span.clone()));
        };
        let id = self
            .session
            .create_block(&kind.value)
            .map_err(|e| self.error(e.to_string(), kind.span.clone()))?;
        self.pending.push(id);

        if top {
            let x = self.coordinate(tag, "x")?.unwrap_or_default();
            let y = self.coordinate(tag, "y")?.unwrap_or_default();
            self.session
                .set_position(id, x, y)
                .map_err(|e| self.structural(e, &tag.span))?;
        }
        for attribute in &tag.attributes {
            if !matches!(attribute.name.as_str(), "type" | "id" | "x" | "y" | "deletable" | "movable") {
                self.warnings.push(ParseError::warning(
                    format!("ignoring attribute '{}'", attribute.name),
                    attribute.span.clone(),
                    self.file_id,
                ));
            }
        }
        Ok(Frame::Block {
            id,
            id_attribute: tag
                .attribute("id")
                .map(|a| (a.value.clone(), a.span.clone())),
        })
    }

    fn coordinate(&self, tag: &Tag, name: &str) -> Result<Option<f64>, ParseError> {
        let Some(attribute) = tag.attribute(name) else {
            return Ok(None);
        };
        attribute.value.trim().parse::<f64>().map(Some).map_err(|_| {
            self.error(format!("'{}' is not a number", attribute.value), attribute.span.clone())
        })
    }

    /// The mutation decides which inputs exist, so it is applied as soon as it is read.
    fn mutation(&mut self, id: BlockId, tag: &Tag) -> Result<(), ParseError> {
        let Some(items) = tag.attribute("items") else {
            return Ok(());
        };
        let count = items.value.trim().parse::<usize>().map_err(|_| {
            self.error(
                format!("item count '{}' is not a whole number", items.value),
                items.span.clone(),
            )
        })?;
        self.session
            .set_item_count(id, count)
            .map_err(|e| self.structural(e, &tag.span))
    }

    fn name_of(&self, tag: &Tag) -> Result<String, ParseError> {
        tag.attribute("name").map(|a| a.value.clone()).ok_or_else(|| {
            self.error(
                format!("<{}> is missing its 'name' attribute", tag.name),
                tag.span.clone(),
            )
        })
    }

    fn text(&mut self, span: Range<usize>) -> Result<(), ParseError> {
        let raw = &self.source[span.clone()];
        if let Some(Open {
            frame: Frame::Field { text, .. },
            ..
        }) = self.open.last_mut()
        {
            let decoded = unescape(raw).map_err(|e| {
                ParseError::error(format!("cannot decode text: {}", e), span.clone(), self.file_id)
            })?;
            text.push_str(&decoded);
        } else if self.open.is_empty() && !raw.trim().is_empty() {
            return Err(self.error("text outside the root element", span));
        }
        Ok(())
    }

    fn close(&mut self, name: &str, span: Range<usize>) -> Result<(), ParseError> {
        let Some(open) = self.open.pop() else {
            return Err(self.error(format!("unexpected '</{}>'", name), span));
        };
        if open.name != name {
            return Err(self
                .error(format!("expected '</{}>', found '</{}>'", open.name, name), span)
                .with_related(open.span, "opened here"));
        }
        match open.frame {
            Frame::Block { id, id_attribute } => self.finish_block(id, id_attribute, open.span),
            Frame::Field { block, name, text } => {
                if let Err(e) = self.session.set_field(block, &name, &text) {
                    let error = self.structural(e, &open.span);
                    self.fail(error);
                }
            }
            Frame::Link {
                block,
                link,
                child: Some(child),
            } => {
                let attached = match &link {
                    Link::Value(input) => self.session.attach_value(child, block, input),
                    Link::Statement(input) => self.session.attach_statement(child, block, input),
                    Link::Next => self.session.attach_next(child, block),
                };
                if let Err(e) = attached {
                    let error = self.structural(e, &open.span);
                    self.fail(error);
                }
            }
            Frame::Link { child: None, .. } | Frame::Workspace | Frame::Ignored => {}
        }
        Ok(())
    }

    fn finish_block(&mut self, id: BlockId, id_attribute: Option<(String, Range<usize>)>, span: Range<usize>) {
        self.spans.insert(id, span);
        if let Some((name, name_span)) = id_attribute {
            if let Some(previous) = self.names.insert(name.clone(), id) {
                self.warnings.push(
                    ParseError::warning(
                        format!("block id '{}' is used more than once", name),
                        name_span,
                        self.file_id,
                    )
                    .with_note(format!("the earlier block is {}", previous)),
                );
            }
        }
        match self.open.last_mut() {
            Some(Open {
                frame: Frame::Link { child, .. },
                ..
            }) => *child = Some(id),
            Some(Open {
                frame: Frame::Workspace,
                ..
            }) => {
                self.blocks.push(id);
                self.pending.clear();
            }
            _ => {}
        }
    }

    fn finish(&mut self) -> Result<(), ParseError> {
        let end = self.source.len();
        if let Some(open) = self.open.last() {
            return Err(self
                .error(format!("unexpected end of input in element '{}'", open.name), end..end)
                .with_related(open.span.clone(), "opened here"));
        }
        if !self.seen_root {
            return Err(self.error("document has no root element", 0..0));
        }
        Ok(())
    }

    /// Record a block-level error and drop the top-level block being read.
    ///
    /// The rest of that block's elements are read as ignored content.
    fn fail(&mut self, error: ParseError) {
        self.errors.push(error);
        self.discard_pending();
        for open in self.open.iter_mut().skip(1) {
            open.frame = Frame::Ignored;
        }
    }

    fn discard_pending(&mut self) {
        for id in std::mem::take(&mut self.pending) {
            // Blocks attached to an earlier pending block went with it.
            if self.session.block(id).is_some() {
                self.discard(id);
            }
        }
    }

    fn discard(&mut self, id: BlockId) {
        if let Err(e) = self.session.dispose_block(id) {
            warn!("cannot dispose partially loaded block {}: {}", id, e);
        }
    }
}

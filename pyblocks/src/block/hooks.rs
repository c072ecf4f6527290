use tracing::{debug, warn};

use crate::block::BlockId;
use crate::block::kind::{InputSpec, KindHooks};
use crate::session::EditorSession;
use crate::types::TypeVecs;

/// Number literals declare `int` or `float` depending on their text.
///
/// Text that is not a finite decimal literal is refused, so the field always holds valid
/// Python.
#[derive(Debug)]
pub struct NumberLiteral;

impl NumberLiteral {
    /// `int` for an optionally signed run of digits, `float` for any other finite number.
    pub fn classify(text: &str) -> Option<&'static str> {
        let text = text.trim();
        let digits = text.strip_prefix(['+', '-']).unwrap_or(text);
        if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
            return Some("int");
        }
        // `inf` and `NaN` parse as f64 but are not Python literals.
        match text.parse::<f64>() {
            Ok(value) if value.is_finite() => Some("float"),
            _ => None,
        }
    }

    fn redeclare(session: &mut EditorSession, block: BlockId) {
        let Some(text) = session
            .block(block)
            .and_then(|b| b.field("NUM").map(str::to_string))
        else {
            return;
        };
        let Some(ty) = NumberLiteral::classify(&text) else {
            warn!(%block, text, "number literal holds no number");
            return;
        };
        match TypeVecs::parse(&[[ty]]) {
            Ok(vecs) => {
                if let Err(e) = session.set_type_vecs(block, vecs) {
                    warn!(%block, "cannot redeclare number literal: {}", e);
                }
            }
            Err(e) => warn!(%block, "cannot redeclare number literal: {}", e),
        }
    }
}

impl KindHooks for NumberLiteral {
    fn on_create(&self, session: &mut EditorSession, block: BlockId) {
        NumberLiteral::redeclare(session, block);
    }

    fn on_field_change(&self, session: &mut EditorSession, block: BlockId, field: &str) {
        if field == "NUM" {
            NumberLiteral::redeclare(session, block);
        }
    }

    fn accepts_field(&self, field: &str, value: &str) -> bool {
        field != "NUM" || NumberLiteral::classify(value).is_some()
    }
}

/// List literal with a variable number of item holes that all share one element type.
///
/// Filling the last free hole appends another one.
#[derive(Debug)]
pub struct GrowingList;

impl GrowingList {
    pub const DEFAULT_ITEMS: usize = 3;

    pub fn item_name(index: usize) -> String {
        format!("ITEM{}", index)
    }

    /// Inputs of a list literal holding `items` holes.
    pub fn item_inputs(items: usize) -> Vec<InputSpec> {
        if items == 0 {
            return vec![InputSpec::dummy("EMPTY", "[ ]")];
        }
        (0..items)
            .map(|i| {
                let label = if i == 0 { "[" } else { "," };
                InputSpec::value(&GrowingList::item_name(i), label)
            })
            .collect()
    }

    /// `[matching × items, *matching]`.
    pub fn table(items: usize) -> Vec<Vec<&'static str>> {
        let mut row = vec!["matching"; items];
        row.push("*matching");
        vec![row]
    }
}

impl KindHooks for GrowingList {
    fn on_attach(&self, session: &mut EditorSession, block: BlockId, input: usize) {
        let Some(b) = session.block(block) else {
            return;
        };
        let items = b.value_slot_count();
        let all_filled = b
            .inputs
            .iter()
            .filter_map(|i| i.connection)
            .all(|c| session.connection(c).is_some_and(|c| c.is_connected()));
        if input + 1 == items && all_filled {
            debug!(%block, items = items + 1, "growing list literal");
            if let Err(e) = session.reshape_items(block, items + 1) {
                warn!(%block, "cannot grow list literal: {}", e);
            }
        }
    }

    fn inputs_for_items(&self, items: usize) -> Option<Vec<InputSpec>> {
        Some(GrowingList::item_inputs(items))
    }

    fn vectors_for_items(&self, items: usize) -> Option<TypeVecs> {
        TypeVecs::parse(&GrowingList::table(items)).ok()
    }
}

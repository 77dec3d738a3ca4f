use std::collections::HashMap;

use crate::model::{Block, ListType};

/// Bullet glyphs per nesting level; deeper levels reuse the last one. All three exist in
/// WinAnsi so the standard PDF faces can draw them.
pub const BULLET_GLYPHS: [char; 3] = ['\u{2022}', 'o', '\u{00B7}'];

pub fn bullet_glyph(level: usize) -> char {
    BULLET_GLYPHS[level.min(BULLET_GLYPHS.len() - 1)]
}

/// Computes list prefixes for the paginated renderer, which has no numbering engine of its
/// own. Owned by a single render call; `reset` runs at render start.
#[derive(Debug, Default)]
pub struct ListNumberingContext {
    counters: HashMap<(ListType, usize), u32>,
    last_list_type: Option<ListType>, // of the last top-level item
    in_list: bool,
}

impl ListNumberingContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.counters.clear();
        self.last_list_type = None;
        self.in_list = false;
    }

    /// `"1. "`-style numbers for ordered items, a level glyph plus space for bullets, and
    /// `None` for anything that is not a list item.
    pub fn prefix_for(&mut self, block: &Block) -> Option<String> {
        let Block::ListItem {
            list_type,
            nesting_level,
            item_index,
            ..
        } = *block
        else {
            if self.in_list {
                self.reset();
            }
            return None;
        };

        self.in_list = true;
        let starts_new_list = nesting_level == 0
            && (item_index == 0 || self.last_list_type != Some(list_type));
        if starts_new_list {
            self.counters.clear();
        } else if item_index == 0 {
            // first item of a nested list: restart this level and everything below it
            self.counters.retain(|&(_, level), _| level < nesting_level);
        }
        if nesting_level == 0 {
            self.last_list_type = Some(list_type);
        }

        match list_type {
            ListType::Ordered => {
                let counter = self.counters.entry((list_type, nesting_level)).or_insert(0);
                *counter += 1;
                Some(format!("{counter}. "))
            }
            ListType::Bullet => Some(format!("{} ", bullet_glyph(nesting_level))),
        }
    }
}

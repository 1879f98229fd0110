//! Metadata side-channel
//!
//! A keyed store of string lists at three scopes: whole-CFG, per-block,
//! and per-instruction (block + index). Metadata is how passes talk to
//! each other; nothing in the core may read it to decide program
//! behavior.
//!
//! Instruction-scoped entries address instructions positionally, so
//! whoever edits a block must move the entries along: `shift_up` after
//! an insert, `shift_down` after a removal (dropping the removed
//! slot), `rename_block` / `drop_block` / `rebase_block` when blocks
//! change identity. Replacement at a position keeps its entries.

use std::collections::BTreeMap;

/// Addressing scope for a metadata entry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Scope {
    /// The whole CFG.
    Cfg,
    /// A block, by label.
    Block(String),
    /// An instruction, by block label and index.
    Instr(String, usize),
}

impl Scope {
    pub fn block(label: impl Into<String>) -> Scope {
        Scope::Block(label.into())
    }

    pub fn instr(label: impl Into<String>, index: usize) -> Scope {
        Scope::Instr(label.into(), index)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataStore {
    entries: BTreeMap<(Scope, String), Vec<String>>,
}

impl MetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replace the values under `(scope, key)`.
    pub fn set(&mut self, scope: Scope, key: impl Into<String>, values: Vec<String>) {
        self.entries.insert((scope, key.into()), values);
    }

    /// Append to the values under `(scope, key)`, creating the entry
    /// if absent.
    pub fn append(&mut self, scope: Scope, key: impl Into<String>, values: Vec<String>) {
        self.entries
            .entry((scope, key.into()))
            .or_default()
            .extend(values);
    }

    pub fn get(&self, scope: &Scope, key: &str) -> Option<&[String]> {
        self.entries
            .get(&(scope.clone(), key.to_string()))
            .map(Vec::as_slice)
    }

    /// Read with a caller-supplied default.
    pub fn get_or<'a>(&'a self, scope: &Scope, key: &str, default: &'a [String]) -> &'a [String] {
        self.get(scope, key).unwrap_or(default)
    }

    /// First value under `(scope, key)`, for single-valued keys.
    pub fn get_first(&self, scope: &Scope, key: &str) -> Option<&str> {
        self.get(scope, key)?.first().map(String::as_str)
    }

    pub fn remove(&mut self, scope: &Scope, key: &str) -> Option<Vec<String>> {
        self.entries.remove(&(scope.clone(), key.to_string()))
    }

    /// All entries, sorted by scope then key.
    pub fn iter(&self) -> impl Iterator<Item = (&Scope, &str, &[String])> {
        self.entries
            .iter()
            .map(|((scope, key), values)| (scope, key.as_str(), values.as_slice()))
    }

    /// Entries scoped to `block` (block scope and instruction scope).
    pub fn iter_block(&self, block: &str) -> impl Iterator<Item = (&Scope, &str, &[String])> {
        let block = block.to_string();
        self.iter().filter(move |(scope, _, _)| match scope {
            Scope::Block(label) | Scope::Instr(label, _) => label == &block,
            Scope::Cfg => false,
        })
    }

    /// Companion to `BasicBlock::insert(pos, _)`: entries at indices
    /// `>= pos` in `block` move up by one.
    pub fn shift_up(&mut self, block: &str, pos: usize) {
        self.remap_indices(block, |index| {
            if index >= pos {
                Some(index + 1)
            } else {
                Some(index)
            }
        });
    }

    /// Companion to `BasicBlock::remove(pos)`: entries at `pos` are
    /// dropped, entries above move down by one.
    pub fn shift_down(&mut self, block: &str, pos: usize) {
        self.remap_indices(block, |index| {
            if index == pos {
                None
            } else if index > pos {
                Some(index - 1)
            } else {
                Some(index)
            }
        });
    }

    /// Companion to `Cfg::rename_block`.
    pub fn rename_block(&mut self, old: &str, new: &str) {
        let taken = self.take_block_entries(old);
        for ((scope, key), values) in taken {
            let scope = match scope {
                Scope::Block(_) => Scope::Block(new.to_string()),
                Scope::Instr(_, index) => Scope::Instr(new.to_string(), index),
                Scope::Cfg => Scope::Cfg,
            };
            self.entries.insert((scope, key), values);
        }
    }

    /// Companion to `Cfg::remove_block`: all entries scoped to the
    /// block are dropped.
    pub fn drop_block(&mut self, block: &str) {
        self.take_block_entries(block);
    }

    /// Companion to `Cfg::merge_blocks`: instruction entries of `from`
    /// move to `to` at `offset + index`; block-scope entries of `from`
    /// are dropped with the block.
    pub fn rebase_block(&mut self, from: &str, to: &str, offset: usize) {
        let taken = self.take_block_entries(from);
        for ((scope, key), values) in taken {
            if let Scope::Instr(_, index) = scope {
                self.entries
                    .insert((Scope::Instr(to.to_string(), offset + index), key), values);
            }
        }
    }

    fn take_block_entries(&mut self, block: &str) -> Vec<((Scope, String), Vec<String>)> {
        let keys: Vec<(Scope, String)> = self
            .entries
            .keys()
            .filter(|(scope, _)| match scope {
                Scope::Block(label) | Scope::Instr(label, _) => label == block,
                Scope::Cfg => false,
            })
            .cloned()
            .collect();
        keys.into_iter()
            .map(|key| {
                let values = self.entries.remove(&key).expect("key just listed");
                (key, values)
            })
            .collect()
    }

    fn remap_indices(&mut self, block: &str, remap: impl Fn(usize) -> Option<usize>) {
        let taken = self.take_block_entries(block);
        for ((scope, key), values) in taken {
            match scope {
                Scope::Instr(label, index) => {
                    if let Some(index) = remap(index) {
                        self.entries.insert((Scope::Instr(label, index), key), values);
                    }
                }
                other => {
                    self.entries.insert((other, key), values);
                }
            }
        }
    }
}

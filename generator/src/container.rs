use std::fmt;

use crate::error::{MastError, Result};

/// Where a child sits inside its parent.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Slot {
    Label(&'static str),
    Position(usize),
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Label(l) => f.write_str(l),
            Slot::Position(i) => write!(f, "#{i}"),
        }
    }
}

/// Fixed, ordered set of named slots, e.g. `left` / `right`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LabeledContainer<T> {
    slots: Vec<(&'static str, T)>,
}

impl<T: Copy + PartialEq + fmt::Debug> LabeledContainer<T> {
    pub fn new(slots: impl IntoIterator<Item = (&'static str, T)>) -> Self {
        Self {
            slots: slots.into_iter().collect(),
        }
    }

    fn position(&self, label: &str) -> Result<usize> {
        self.slots
            .iter()
            .position(|(l, _)| *l == label)
            .ok_or_else(|| MastError::UnknownLabel {
                label: label.to_string(),
            })
    }

    pub fn get(&self, label: &str) -> Result<T> {
        Ok(self.slots[self.position(label)?].1)
    }

    /// Overwrite a slot, returning what was there.
    pub fn set(&mut self, label: &str, value: T) -> Result<T> {
        let i = self.position(label)?;
        Ok(std::mem::replace(&mut self.slots[i].1, value))
    }

    pub fn labels(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.slots.iter().map(|(l, _)| *l)
    }

    pub fn enumerate(&self) -> impl Iterator<Item = (Slot, T)> + '_ {
        self.slots.iter().map(|(l, v)| (Slot::Label(*l), *v))
    }

    pub fn replace(&mut self, old: T, new: T) -> Result<Slot> {
        let slot = self
            .slots
            .iter_mut()
            .find(|slot| slot.1 == old)
            .ok_or_else(|| MastError::NotAChild {
                child: format!("{old:?}"),
            })?;
        slot.1 = new;
        Ok(Slot::Label(slot.0))
    }

    pub fn swap(&mut self, a: &str, b: &str) -> Result<()> {
        let (i, j) = (self.position(a)?, self.position(b)?);
        let (va, vb) = (self.slots[i].1, self.slots[j].1);
        self.slots[i].1 = vb;
        self.slots[j].1 = va;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Variable-length ordered children, used by repetition productions.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SequenceContainer<T> {
    items: Vec<T>,
}

impl<T: Copy + PartialEq + fmt::Debug> SequenceContainer<T> {
    pub fn new(items: impl IntoIterator<Item = T>) -> Self {
        Self {
            items: items.into_iter().collect(),
        }
    }

    pub fn get(&self, index: usize) -> Option<T> {
        self.items.get(index).copied()
    }

    pub fn push(&mut self, item: T) {
        self.items.push(item)
    }

    pub fn insert(&mut self, index: usize, item: T) {
        self.items.insert(index, item)
    }

    pub fn remove(&mut self, item: T) -> Result<usize> {
        let i = self.index_of(item)?;
        self.items.remove(i);
        Ok(i)
    }

    fn index_of(&self, item: T) -> Result<usize> {
        self.items
            .iter()
            .position(|v| *v == item)
            .ok_or_else(|| MastError::NotAChild {
                child: format!("{item:?}"),
            })
    }

    pub fn enumerate(&self) -> impl Iterator<Item = (Slot, T)> + '_ {
        self.items
            .iter()
            .enumerate()
            .map(|(i, v)| (Slot::Position(i), *v))
    }

    pub fn replace(&mut self, old: T, new: T) -> Result<Slot> {
        let i = self.index_of(old)?;
        self.items[i] = new;
        Ok(Slot::Position(i))
    }

    pub fn exchange(&mut self, a: T, b: T) -> Result<()> {
        let (i, j) = (self.index_of(a)?, self.index_of(b)?);
        self.items.swap(i, j);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Child storage of a non-leaf node.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Children<T> {
    Labeled(LabeledContainer<T>),
    Sequence(SequenceContainer<T>),
}

impl<T: Copy + PartialEq + fmt::Debug> Children<T> {
    pub fn enumerate(&self) -> Box<dyn Iterator<Item = (Slot, T)> + '_> {
        match self {
            Children::Labeled(c) => Box::new(c.enumerate()),
            Children::Sequence(c) => Box::new(c.enumerate()),
        }
    }

    pub fn replace(&mut self, old: T, new: T) -> Result<Slot> {
        match self {
            Children::Labeled(c) => c.replace(old, new),
            Children::Sequence(c) => c.replace(old, new),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Children::Labeled(c) => c.len(),
            Children::Sequence(c) => c.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labeled_replace_keeps_label() {
        let mut c = LabeledContainer::new([("left", 1), ("right", 2)]);
        assert_eq!(c.replace(2, 7), Ok(Slot::Label("right")));
        assert_eq!(c.get("right"), Ok(7));
        assert_eq!(
            c.enumerate().collect::<Vec<_>>(),
            vec![(Slot::Label("left"), 1), (Slot::Label("right"), 7)]
        );
    }

    #[test]
    fn labeled_rejects_unknown_label_and_stranger() {
        let mut c = LabeledContainer::new([("cond", 1)]);
        assert!(matches!(c.get("body"), Err(MastError::UnknownLabel { .. })));
        assert!(matches!(c.replace(9, 3), Err(MastError::NotAChild { .. })));
        assert_eq!(c.get("cond"), Ok(1));
    }

    #[test]
    fn labeled_swap() {
        let mut c = LabeledContainer::new([("left", 1), ("right", 2)]);
        c.swap("left", "right").unwrap();
        assert_eq!((c.get("left"), c.get("right")), (Ok(2), Ok(1)));
        assert_eq!(c.set("left", 5), Ok(2));
    }

    #[test]
    fn sequence_replace_preserves_position() {
        let mut c = SequenceContainer::new([4, 5, 6]);
        assert_eq!(c.replace(5, 9), Ok(Slot::Position(1)));
        assert_eq!(c.get(1), Some(9));
        c.exchange(4, 6).unwrap();
        assert_eq!(c.enumerate().map(|(_, v)| v).collect::<Vec<_>>(), vec![6, 9, 4]);
        assert!(matches!(c.replace(5, 1), Err(MastError::NotAChild { .. })));
    }

    #[test]
    fn sequence_edits() {
        let mut c = SequenceContainer::default();
        c.push(1);
        c.insert(0, 0);
        assert_eq!(c.remove(1), Ok(1));
        assert_eq!(c.len(), 1);
        let children = Children::Sequence(c);
        assert_eq!(children.enumerate().next(), Some((Slot::Position(0), 0)));
    }
}

//! Included/excluded partition of inequality indices.

/// Most recent change made to an [`IndexSelector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Included(usize),
    Excluded(usize),
}

/// Partition of `0..len` into included and excluded indices.
///
/// Remembers the last index moved in each direction, which the active-set
/// method uses to avoid immediately undoing its previous step.
#[derive(Debug, Clone)]
pub struct IndexSelector {
    included: Vec<bool>,
    count: usize,
    last_included: Option<usize>,
    last_excluded: Option<usize>,
    last_toggle: Option<Toggle>,
}

impl IndexSelector {
    /// Every index starts excluded.
    pub fn new(len: usize) -> Self {
        Self {
            included: vec![false; len],
            count: 0,
            last_included: None,
            last_excluded: None,
            last_toggle: None,
        }
    }

    pub fn len(&self) -> usize {
        self.included.len()
    }

    pub fn is_empty(&self) -> bool {
        self.included.is_empty()
    }

    pub fn count_included(&self) -> usize {
        self.count
    }

    pub fn count_excluded(&self) -> usize {
        self.len() - self.count
    }

    pub fn is_included(&self, index: usize) -> bool {
        self.included[index]
    }

    /// Included indices, increasing.
    pub fn included(&self) -> Vec<usize> {
        self.iter_with(true).collect()
    }

    /// Excluded indices, increasing.
    pub fn excluded(&self) -> Vec<usize> {
        self.iter_with(false).collect()
    }

    pub fn last_included(&self) -> Option<usize> {
        self.last_included
    }

    pub fn last_excluded(&self) -> Option<usize> {
        self.last_excluded
    }

    pub fn last_toggle(&self) -> Option<Toggle> {
        self.last_toggle
    }

    /// True when the most recent change was an inclusion.
    pub fn was_last_inclusion(&self) -> bool {
        matches!(self.last_toggle, Some(Toggle::Included(_)))
    }

    /// Include `index`. Returns false if it already was.
    pub fn include(&mut self, index: usize) -> bool {
        if self.included[index] {
            return false;
        }
        self.included[index] = true;
        self.count += 1;
        self.last_included = Some(index);
        self.last_toggle = Some(Toggle::Included(index));
        true
    }

    /// Exclude `index`. Returns false if it already was.
    pub fn exclude(&mut self, index: usize) -> bool {
        if !self.included[index] {
            return false;
        }
        self.included[index] = false;
        self.count -= 1;
        self.last_excluded = Some(index);
        self.last_toggle = Some(Toggle::Excluded(index));
        true
    }

    /// Exclude the highest included index.
    pub fn shrink(&mut self) -> Option<usize> {
        let index = (0..self.len()).rev().find(|&i| self.included[i])?;
        self.exclude(index);
        Some(index)
    }

    /// Undo the most recent inclusion, if that index is still included.
    pub fn revert_last_inclusion(&mut self) -> Option<usize> {
        let index = self.last_included.filter(|&i| self.included[i])?;
        self.exclude(index);
        Some(index)
    }

    fn iter_with(&self, flag: bool) -> impl Iterator<Item = usize> + '_ {
        self.included
            .iter()
            .enumerate()
            .filter(move |(_, &inc)| inc == flag)
            .map(|(i, _)| i)
    }
}

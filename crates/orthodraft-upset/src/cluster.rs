//! Exclusive intersections over every non-empty subset of labels.
//!
//! For labels `L` and a subset `C ⊆ L`:
//!
//! ```text
//! exclusive(C) = (∩_{l ∈ C} sets[l]) − (∪_{l ∈ L∖C} sets[l])
//! ```
//!
//! Subsets are visited as bitmasks over label indices, by increasing size and
//! then lexicographically. An element lies in `exclusive(C)` exactly when the
//! mask of sets containing it equals `C`, so the exclusive sets partition the
//! union of all sets.

use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Enumeration is `O(2^n)`; beyond this the output alone is unmanageable.
pub const MAX_LABELS: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClusterError {
    #[error("too many labels for subset enumeration: {labels} (max {max})")]
    TooManyLabels { labels: usize, max: usize },
}

/// One subset of labels and the elements exclusive to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cluster<L, T> {
    pub labels: BTreeSet<L>,
    pub members: BTreeSet<T>,
}

impl<L, T> Cluster<L, T> {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Clusters in enumeration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clusters<L, T> {
    clusters: Vec<Cluster<L, T>>,
}

impl<L: Ord, T: Ord> Clusters<L, T> {
    pub fn iter(&self) -> std::slice::Iter<'_, Cluster<L, T>> {
        self.clusters.iter()
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    pub fn get(&self, labels: &BTreeSet<L>) -> Option<&BTreeSet<T>> {
        self.clusters
            .iter()
            .find(|c| &c.labels == labels)
            .map(|c| &c.members)
    }

    /// Sum of all exclusive-set sizes.
    pub fn total(&self) -> usize {
        self.clusters.iter().map(Cluster::len).sum()
    }

    pub fn counts(&self) -> BTreeMap<BTreeSet<L>, usize>
    where
        L: Clone,
    {
        self.clusters
            .iter()
            .map(|c| (c.labels.clone(), c.members.len()))
            .collect()
    }

    pub fn into_map(self) -> BTreeMap<BTreeSet<L>, BTreeSet<T>> {
        self.clusters
            .into_iter()
            .map(|c| (c.labels, c.members))
            .collect()
    }
}

impl<L, T> IntoIterator for Clusters<L, T> {
    type Item = Cluster<L, T>;
    type IntoIter = std::vec::IntoIter<Cluster<L, T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.clusters.into_iter()
    }
}

/// All non-empty masks over `n` bits, by increasing popcount then
/// lexicographic order of the set bit indices.
pub fn subset_masks(n: usize) -> Vec<u32> {
    let mut masks = Vec::with_capacity((1usize << n).saturating_sub(1));
    for k in 1..=n {
        // indices of the current k-combination
        let mut idx: Vec<usize> = (0..k).collect();
        loop {
            masks.push(idx.iter().fold(0u32, |m, &i| m | (1 << i)));

            // advance to the next combination
            let mut pos = k;
            while pos > 0 && idx[pos - 1] == n - k + pos - 1 {
                pos -= 1;
            }
            if pos == 0 {
                break;
            }
            idx[pos - 1] += 1;
            for j in pos..k {
                idx[j] = idx[j - 1] + 1;
            }
        }
    }
    masks
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ClusterEnumerator {
    pub remove_zero: bool,
}

impl ClusterEnumerator {
    pub fn new(remove_zero: bool) -> Self {
        Self { remove_zero }
    }

    pub fn enumerate<L, T>(
        &self,
        named_sets: &BTreeMap<L, BTreeSet<T>>,
    ) -> Result<Clusters<L, T>, ClusterError>
    where
        L: Ord + Clone,
        T: Ord + Clone + std::hash::Hash,
    {
        let n = named_sets.len();
        if n > MAX_LABELS {
            return Err(ClusterError::TooManyLabels {
                labels: n,
                max: MAX_LABELS,
            });
        }
        let labels: Vec<&L> = named_sets.keys().collect();

        let mut membership: HashMap<&T, u32> = HashMap::new();
        for (i, set) in named_sets.values().enumerate() {
            for item in set {
                *membership.entry(item).or_insert(0) |= 1 << i;
            }
        }
        let mut by_mask: HashMap<u32, BTreeSet<T>> = HashMap::new();
        for (item, mask) in membership {
            by_mask.entry(mask).or_default().insert(item.clone());
        }

        let mut clusters = Vec::new();
        for mask in subset_masks(n) {
            let members = by_mask.remove(&mask).unwrap_or_default();
            if self.remove_zero && members.is_empty() {
                continue;
            }
            let subset = (0..n)
                .filter(|i| mask & (1 << i) != 0)
                .map(|i| labels[i].clone())
                .collect();
            clusters.push(Cluster {
                labels: subset,
                members,
            });
        }
        Ok(Clusters { clusters })
    }

    /// Scalar view: subset → size of its exclusive set.
    pub fn counts<L, T>(
        &self,
        named_sets: &BTreeMap<L, BTreeSet<T>>,
    ) -> Result<BTreeMap<BTreeSet<L>, usize>, ClusterError>
    where
        L: Ord + Clone,
        T: Ord + Clone + std::hash::Hash,
    {
        Ok(self.enumerate(named_sets)?.counts())
    }
}

/// `exclusive(subset)` computed straight from the definition. Labels in
/// `subset` that are not in `named_sets` contribute an empty set.
pub fn exclusive_intersection<L, T>(
    named_sets: &BTreeMap<L, BTreeSet<T>>,
    subset: &BTreeSet<L>,
) -> BTreeSet<T>
where
    L: Ord,
    T: Ord + Clone,
{
    let mut inside = subset.iter().map(|l| named_sets.get(l));
    let Some(first) = inside.next() else {
        return BTreeSet::new();
    };
    let Some(first) = first else {
        return BTreeSet::new();
    };
    let mut acc: BTreeSet<T> = first.clone();
    for set in inside {
        match set {
            Some(set) => acc.retain(|x| set.contains(x)),
            None => return BTreeSet::new(),
        }
    }
    for (label, set) in named_sets {
        if !subset.contains(label) {
            acc.retain(|x| !set.contains(x));
        }
    }
    acc
}

/// Convenience wrapper around [`ClusterEnumerator::enumerate`].
pub fn enumerate<L, T>(
    named_sets: &BTreeMap<L, BTreeSet<T>>,
    remove_zero: bool,
) -> Result<BTreeMap<BTreeSet<L>, BTreeSet<T>>, ClusterError>
where
    L: Ord + Clone,
    T: Ord + Clone + std::hash::Hash,
{
    Ok(ClusterEnumerator::new(remove_zero)
        .enumerate(named_sets)?
        .into_map())
}

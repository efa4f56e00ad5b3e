use crate::models::DiversityGroup;
use crate::services::ranking::ScoredItem;
use std::collections::{BTreeSet, HashMap, VecDeque};
use tracing::debug;

/// Diversity Layer - 滑動窗口多樣性重排
///
/// Within any `window` consecutive positions, one tier/category group may
/// appear at most `cap` times. Violators are deferred, never dropped.
pub struct DiversityLayer {
    cap: usize, // 同一分組在窗口內最多出現次數
}

impl Default for DiversityLayer {
    fn default() -> Self {
        Self::new(2)
    }
}

/// Bookkeeping for one rerank pass. Groups are interned to dense ids.
struct WindowState {
    cap: usize,
    lookback: usize,
    /// Occurrences of each group among the last `lookback` placements
    counts: Vec<usize>,
    /// Groups of the last `lookback` placements, oldest first
    recent: VecDeque<usize>,
    /// Deferred item indexes per group, in sort order
    deferred: Vec<VecDeque<usize>>,
    /// Every deferred item index
    pending: BTreeSet<usize>,
    /// Head of each deferred queue whose group is under the cap
    ready: BTreeSet<usize>,
}

impl WindowState {
    fn new(cap: usize, lookback: usize, group_count: usize) -> Self {
        Self {
            cap,
            lookback,
            counts: vec![0; group_count],
            recent: VecDeque::with_capacity(lookback + 1),
            deferred: vec![VecDeque::new(); group_count],
            pending: BTreeSet::new(),
            ready: BTreeSet::new(),
        }
    }

    fn at_cap(&self, group: usize) -> bool {
        self.counts[group] >= self.cap
    }

    fn defer(&mut self, idx: usize, group: usize) {
        self.deferred[group].push_back(idx);
        self.pending.insert(idx);
    }

    /// Record a placement of `idx` and slide the window forward.
    fn place(&mut self, idx: usize, group: usize) {
        if self.pending.remove(&idx) {
            self.ready.remove(&idx);
            self.deferred[group].pop_front();
        }

        self.counts[group] += 1;
        self.recent.push_back(group);
        self.refresh(group);

        if self.recent.len() > self.lookback {
            if let Some(evicted) = self.recent.pop_front() {
                self.counts[evicted] -= 1;
                self.refresh(evicted);
            }
        }
    }

    fn refresh(&mut self, group: usize) {
        if let Some(&head) = self.deferred[group].front() {
            if self.at_cap(group) {
                self.ready.remove(&head);
            } else {
                self.ready.insert(head);
            }
        }
    }
}

impl DiversityLayer {
    pub fn new(cap: usize) -> Self {
        Self { cap: cap.max(1) }
    }

    /// Reorder an already sorted sequence. At each position the first remaining
    /// candidate that keeps its group under the cap is taken; when none does,
    /// the head of the remaining sequence is taken as is.
    ///
    /// Each item is deferred at most once and every placement touches only the
    /// entering and leaving groups, so a pass is O(n log n).
    pub fn rerank(&self, ranked: Vec<ScoredItem>, window: usize) -> Vec<ScoredItem> {
        let window = window.max(1);
        if ranked.len() <= 1 || window <= self.cap {
            return ranked;
        }

        let total = ranked.len();
        let groups = intern_groups(&ranked);
        let group_count = groups.iter().max().map_or(0, |g| g + 1);

        let mut state = WindowState::new(self.cap, window - 1, group_count);
        let mut order: Vec<usize> = Vec::with_capacity(total);
        let mut next = 0usize;
        let mut deferred = 0usize;
        let mut forced = 0usize;

        while order.len() < total {
            let pick = match state.ready.first().copied() {
                Some(idx) => Some(idx),
                None => {
                    while next < total && state.at_cap(groups[next]) {
                        state.defer(next, groups[next]);
                        deferred += 1;
                        next += 1;
                    }
                    if next < total {
                        next += 1;
                        Some(next - 1)
                    } else {
                        None
                    }
                }
            };

            let idx = match pick.or_else(|| state.pending.first().copied()) {
                Some(idx) => idx,
                None => break,
            };
            if pick.is_none() {
                forced += 1;
            }

            state.place(idx, groups[idx]);
            order.push(idx);
        }

        debug!(
            item_count = total,
            window = window,
            cap = self.cap,
            deferred = deferred,
            forced = forced,
            "Diversity rerank complete"
        );

        let mut slots: Vec<Option<ScoredItem>> = ranked.into_iter().map(Some).collect();
        order
            .into_iter()
            .filter_map(|idx| slots[idx].take())
            .collect()
    }
}

/// Dense group id for every item, in input order.
fn intern_groups(ranked: &[ScoredItem]) -> Vec<usize> {
    let mut ids: HashMap<DiversityGroup<'_>, usize> = HashMap::new();
    ranked
        .iter()
        .map(|s| {
            let next_id = ids.len();
            *ids.entry(s.item.diversity_group()).or_insert(next_id)
        })
        .collect()
}

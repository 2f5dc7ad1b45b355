/// Bounded "largest K" accumulator.
///
/// Backed by a min-heap of at most `limit` entries: the root is always the
/// smallest survivor, so each new candidate costs one comparison and, if it
/// wins, one `O(log k)` replace. Memory stays at `k` entries however many
/// candidates a scan produces.
use std::cmp::Reverse;
use std::collections::BinaryHeap;

pub struct TopK<T: Ord> {
    limit: usize,
    heap: BinaryHeap<Reverse<T>>,
}

impl<T: Ord> TopK<T> {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            heap: BinaryHeap::with_capacity(limit.min(4_096) + 1),
        }
    }

    /// Offer a candidate. Returns `true` if it is currently among the top K.
    pub fn push(&mut self, item: T) -> bool {
        if self.limit == 0 {
            return false;
        }
        if self.heap.len() < self.limit {
            self.heap.push(Reverse(item));
            return true;
        }
        match self.heap.peek() {
            Some(Reverse(smallest)) if item > *smallest => {
                self.heap.pop();
                self.heap.push(Reverse(item));
                true
            }
            _ => false,
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Consume the accumulator, largest first.
    pub fn into_sorted_vec(self) -> Vec<T> {
        // `Reverse` sorts ascending-by-reverse, i.e. largest first.
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|Reverse(item)| item)
            .collect()
    }
}

//! Insertion-order index over slot numbers.
//!
//! The list is intrusive: every slot of the store carries a [`Link`], and the
//! [`OrderIndex`] only remembers the two ends. Links hold slot numbers rather
//! than addresses, so the list stays meaningful while values move between
//! allocations during a rehash (the rehash rebuilds it in the new store).

/// Sentinel marking the absence of a neighbor.
pub(crate) const NIL: usize = usize::MAX;

/// Per-slot neighbors in the order index. Only meaningful for occupied
/// slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Link {
    pub(crate) prev: usize,
    pub(crate) next: usize,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct OrderIndex {
    head: usize,
    tail: usize,
}

impl OrderIndex {
    pub(crate) const fn new() -> Self {
        Self {
            head: NIL,
            tail: NIL,
        }
    }

    #[inline(always)]
    pub(crate) fn head(&self) -> usize {
        self.head
    }

    #[inline(always)]
    pub(crate) fn tail(&self) -> usize {
        self.tail
    }

    /// Appends `index` as the newest entry.
    #[inline]
    pub(crate) fn push_back(&mut self, links: &mut [Link], index: usize) {
        links[index] = Link {
            prev: self.tail,
            next: NIL,
        };

        if self.tail == NIL {
            self.head = index;
        } else {
            links[self.tail].next = index;
        }
        self.tail = index;
    }

    /// Removes `index` from the list. `index` must currently be linked.
    #[inline]
    pub(crate) fn unlink(&mut self, links: &mut [Link], index: usize) {
        let Link { prev, next } = links[index];

        if prev == NIL {
            debug_assert_eq!(self.head, index);
            self.head = next;
        } else {
            links[prev].next = next;
        }

        if next == NIL {
            debug_assert_eq!(self.tail, index);
            self.tail = prev;
        } else {
            links[next].prev = prev;
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;
    use alloc::vec::Vec;

    use super::*;

    fn forward(order: &OrderIndex, links: &[Link]) -> Vec<usize> {
        let mut out = Vec::new();
        let mut cursor = order.head();
        while cursor != NIL {
            out.push(cursor);
            cursor = links[cursor].next;
        }
        out
    }

    fn backward(order: &OrderIndex, links: &[Link]) -> Vec<usize> {
        let mut out = Vec::new();
        let mut cursor = order.tail();
        while cursor != NIL {
            out.push(cursor);
            cursor = links[cursor].prev;
        }
        out
    }

    #[test]
    fn push_and_walk() {
        let mut links = vec![Link { prev: 0, next: 0 }; 8];
        let mut order = OrderIndex::new();
        assert_eq!(order.head(), NIL);
        assert_eq!(order.tail(), NIL);

        for index in [5, 2, 7, 0] {
            order.push_back(&mut links, index);
        }

        assert_eq!(forward(&order, &links), vec![5, 2, 7, 0]);
        assert_eq!(backward(&order, &links), vec![0, 7, 2, 5]);
    }

    #[test]
    fn unlink_head_middle_tail() {
        let mut links = vec![Link { prev: 0, next: 0 }; 8];
        let mut order = OrderIndex::new();
        for index in [1, 3, 4, 6] {
            order.push_back(&mut links, index);
        }

        order.unlink(&mut links, 3);
        assert_eq!(forward(&order, &links), vec![1, 4, 6]);

        order.unlink(&mut links, 1);
        assert_eq!(forward(&order, &links), vec![4, 6]);
        assert_eq!(order.head(), 4);

        order.unlink(&mut links, 6);
        assert_eq!(forward(&order, &links), vec![4]);
        assert_eq!(backward(&order, &links), vec![4]);

        order.unlink(&mut links, 4);
        assert_eq!(order.head(), NIL);
        assert_eq!(order.tail(), NIL);

        order.push_back(&mut links, 3);
        assert_eq!(forward(&order, &links), vec![3]);
    }
}

//! Fixed-capacity ring buffer over a preallocated slot arena.

/// A ring of `N` preallocated slots holding up to `N` live elements.
///
/// `head` is the oldest live element and `tail` the newest. Adding to a full
/// ring recycles the oldest slot as the new tail. Slots are never dropped or
/// reallocated, so values that own heap storage can be overwritten in place
/// with `clone_from`.
#[derive(Debug, Clone)]
pub struct CircularBuffer<T, const N: usize> {
    slots: [T; N],
    head: usize,
    len: usize,
}

impl<T: Default, const N: usize> CircularBuffer<T, N> {
    pub fn new() -> Self {
        assert!(N > 0, "CircularBuffer capacity must be positive");
        Self {
            slots: std::array::from_fn(|_| T::default()),
            head: 0,
            len: 0,
        }
    }
}

impl<T: Default, const N: usize> Default for CircularBuffer<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize> CircularBuffer<T, N> {
    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == N
    }

    fn tail_index(&self) -> Option<usize> {
        (self.len > 0).then(|| (self.head + self.len - 1) % N)
    }

    /// Oldest live element.
    pub fn head(&self) -> Option<&T> {
        (self.len > 0).then(|| &self.slots[self.head])
    }

    pub fn head_mut(&mut self) -> Option<&mut T> {
        (self.len > 0).then(|| &mut self.slots[self.head])
    }

    /// Newest live element.
    pub fn tail(&self) -> Option<&T> {
        self.tail_index().map(|i| &self.slots[i])
    }

    pub fn tail_mut(&mut self) -> Option<&mut T> {
        self.tail_index().map(|i| &mut self.slots[i])
    }

    /// Claim a slot for a new tail element and return it for writing.
    ///
    /// While not full the ring grows by one. Once full, the oldest element is
    /// evicted and its slot becomes the new tail. The returned slot holds
    /// whatever value it held before; callers overwrite it.
    pub fn add(&mut self) -> &mut T {
        let idx = self.claim();
        &mut self.slots[idx]
    }

    /// Shrink by one element. Returns `false` on an empty ring.
    ///
    /// The oldest slot stays put and the tail retreats, so the previous
    /// element becomes the newest again.
    pub fn remove(&mut self) -> bool {
        if self.len == 0 {
            return false;
        }
        self.len -= 1;
        true
    }

    /// Iterate live elements from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        (0..self.len).map(move |offset| &self.slots[(self.head + offset) % N])
    }

    fn claim(&mut self) -> usize {
        if self.len < N {
            self.len += 1;
            (self.head + self.len - 1) % N
        } else {
            let idx = self.head;
            self.head = (self.head + 1) % N;
            idx
        }
    }
}

impl<T: Clone, const N: usize> CircularBuffer<T, N> {
    /// Add a new tail element initialized as a copy of the current tail.
    ///
    /// The copy goes through `clone_from`, reusing the recycled slot's
    /// storage. Returns `None` on an empty ring.
    pub fn add_from_tail(&mut self) -> Option<&mut T> {
        let src = self.tail_index()?;
        let dst = self.claim();

        if src != dst {
            let (lo, hi) = self.slots.split_at_mut(src.max(dst));
            if src < dst {
                hi[0].clone_from(&lo[src]);
            } else {
                lo[dst].clone_from(&hi[0]);
            }
        }

        Some(&mut self.slots[dst])
    }
}

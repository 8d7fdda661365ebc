//! Recency List Module
//!
//! Insertion-ordered doubly linked list over an index arena, used to pick
//! eviction victims.

// == Node ==
#[derive(Debug)]
struct Node<T> {
    value: T,
    prev: Option<usize>,
    next: Option<usize>,
}

// == Recency List ==
/// Doubly linked list whose nodes live in a slot vector.
///
/// - Head = most recently inserted
/// - Tail = least recently inserted
///
/// Slots freed by `pop_back` are reused by later inserts, so a handle
/// returned from `push_front` is only valid until that node is popped.
/// Nothing ever moves a node once linked.
#[derive(Debug)]
pub struct RecencyList<T> {
    slots: Vec<Option<Node<T>>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl<T> RecencyList<T> {
    // == Constructor ==
    /// Creates a new empty list.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }

    // == Push Front ==
    /// Links `value` at the head and returns its slot handle. O(1).
    pub fn push_front(&mut self, value: T) -> usize {
        let node = Node {
            value,
            prev: None,
            next: self.head,
        };

        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(node);
                slot
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        };

        match self.head {
            Some(old_head) => {
                if let Some(n) = self.slots[old_head].as_mut() {
                    n.prev = Some(slot);
                }
            }
            None => self.tail = Some(slot),
        }
        self.head = Some(slot);
        self.len += 1;
        slot
    }

    // == Pop Back ==
    /// Unlinks the tail and returns its slot handle and value. O(1).
    pub fn pop_back(&mut self) -> Option<(usize, T)> {
        let slot = self.tail?;
        let node = self.slots[slot].take()?;

        self.tail = node.prev;
        match node.prev {
            Some(prev) => {
                if let Some(n) = self.slots[prev].as_mut() {
                    n.next = None;
                }
            }
            None => self.head = None,
        }

        self.free.push(slot);
        self.len -= 1;
        Some((slot, node.value))
    }

    // == Get ==
    /// Returns the value at `slot` if it is linked.
    pub fn get(&self, slot: usize) -> Option<&T> {
        self.slots.get(slot)?.as_ref().map(|n| &n.value)
    }

    // == Peek Back ==
    /// Returns the next eviction victim without unlinking it.
    #[cfg(test)]
    pub fn peek_back(&self) -> Option<&T> {
        self.tail.and_then(|slot| self.get(slot))
    }

    // == Length ==
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    // == Iteration ==
    /// Iterates from head (newest) to tail (oldest).
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            list: self,
            cursor: self.head,
        }
    }
}

impl<T> Default for RecencyList<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Head-to-tail iterator over a [`RecencyList`].
pub struct Iter<'a, T> {
    list: &'a RecencyList<T>,
    cursor: Option<usize>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let slot = self.cursor?;
        let node = self.list.slots[slot].as_ref()?;
        self.cursor = node.next;
        Some(&node.value)
    }
}

//! Bounded Queue Module
//!
//! Fixed-capacity FIFO ring buffer coordinated by a free-slot semaphore
//! and an available-item semaphore.

use std::sync::Mutex;

use tokio::sync::Semaphore;

use crate::error::ProxyError;

// == Ring ==
#[derive(Debug)]
struct Ring<T> {
    buf: Vec<Option<T>>,
    /// Position of the next item to remove
    front: usize,
    /// Position of the next free slot to write
    rear: usize,
}

// == Bounded Queue ==
/// Producer/consumer queue with a fixed number of slots.
///
/// `insert` waits while every slot is taken and `remove` waits while the
/// ring is empty. The mutex only guards the index update and is never held
/// across an await point.
#[derive(Debug)]
pub struct BoundedQueue<T> {
    ring: Mutex<Ring<T>>,
    capacity: usize,
    slots: Semaphore,
    items: Semaphore,
}

impl<T> BoundedQueue<T> {
    // == Constructor ==
    /// Creates an empty queue with `capacity` slots.
    ///
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let mut buf = Vec::with_capacity(capacity);
        buf.resize_with(capacity, || None);

        Self {
            ring: Mutex::new(Ring {
                buf,
                front: 0,
                rear: 0,
            }),
            capacity,
            slots: Semaphore::new(capacity),
            items: Semaphore::new(0),
        }
    }

    // == Insert ==
    /// Appends `item`, waiting for a free slot if the queue is full.
    ///
    /// Fails only once the queue has been closed.
    pub async fn insert(&self, item: T) -> Result<(), ProxyError> {
        let permit = self
            .slots
            .acquire()
            .await
            .map_err(|_| ProxyError::QueueClosed)?;
        permit.forget();

        {
            let mut ring = self.lock_ring();
            let rear = ring.rear;
            ring.buf[rear % self.capacity] = Some(item);
            ring.rear = rear.wrapping_add(1);
        }

        self.items.add_permits(1);
        Ok(())
    }

    // == Remove ==
    /// Takes the oldest item, waiting for one if the queue is empty.
    ///
    /// Returns `None` once the queue has been closed.
    pub async fn remove(&self) -> Option<T> {
        let permit = self.items.acquire().await.ok()?;
        permit.forget();

        let item = {
            let mut ring = self.lock_ring();
            let front = ring.front;
            let item = ring.buf[front % self.capacity].take();
            ring.front = front.wrapping_add(1);
            item
        };

        self.slots.add_permits(1);
        item
    }

    // == Close ==
    /// Wakes every waiter; later inserts fail and removes return `None`.
    ///
    /// Items still in the ring are dropped with the queue.
    pub fn close(&self) {
        self.slots.close();
        self.items.close();
    }

    #[cfg(test)]
    pub fn is_closed(&self) -> bool {
        self.items.is_closed()
    }

    /// Number of items waiting to be removed.
    pub fn len(&self) -> usize {
        let ring = self.lock_ring();
        ring.rear.wrapping_sub(ring.front)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn lock_ring(&self) -> std::sync::MutexGuard<'_, Ring<T>> {
        // Index bookkeeping cannot panic midway, so a poisoned ring is intact.
        self.ring.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

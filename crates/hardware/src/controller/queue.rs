//! Bounded request queue.

use std::collections::VecDeque;

use super::request::Request;

/// FIFO of requests with a fixed capacity.
#[derive(Debug)]
pub struct RequestQueue {
    q: VecDeque<Request>,
    max: usize,
}

impl RequestQueue {
    /// Creates an empty queue holding at most `max` requests.
    pub fn new(max: usize) -> Self {
        Self {
            q: VecDeque::with_capacity(max),
            max,
        }
    }

    /// Capacity.
    pub const fn max(&self) -> usize {
        self.max
    }

    /// Number of queued requests.
    pub fn len(&self) -> usize {
        self.q.len()
    }

    /// Returns `true` if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.q.is_empty()
    }

    /// Returns `true` when the queue is at capacity.
    pub fn is_full(&self) -> bool {
        self.q.len() >= self.max
    }

    /// Appends a request; hands it back if the queue is full.
    ///
    /// # Errors
    ///
    /// Returns the request unchanged when the queue is at capacity.
    pub fn push(&mut self, req: Request) -> Result<(), Request> {
        if self.is_full() {
            return Err(req);
        }
        self.q.push_back(req);
        Ok(())
    }

    /// Appends a request even past capacity.
    ///
    /// Reserved for requests the controller generates for itself.
    pub(crate) fn push_unbounded(&mut self, req: Request) {
        self.q.push_back(req);
    }

    /// Removes and returns the request at `index`.
    pub fn remove(&mut self, index: usize) -> Option<Request> {
        self.q.remove(index)
    }

    /// Borrows the request at `index`.
    pub fn get(&self, index: usize) -> Option<&Request> {
        self.q.get(index)
    }

    /// Mutably borrows the request at `index`.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Request> {
        self.q.get_mut(index)
    }

    /// Iterates in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = &Request> {
        self.q.iter()
    }

    /// Mutably iterates in arrival order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Request> {
        self.q.iter_mut()
    }
}

//! A generic FIFO ring buffer, used for the per-delay-layer delivery queues.
//!
//! Each discrete delay layer owns one of these; items enter at the tail when
//! a synapse schedules a delivery and leave at the head once their delay
//! has elapsed. `VecDeque` already provides the amortized-growth ring
//! buffer the reference simulator hand-rolled with realloc-and-memmove.
use std::collections::VecDeque;

/// A ring buffer of items awaiting processing in arrival order.
#[derive(Debug, Clone)]
pub struct Fifo<T> {
    items: VecDeque<T>,
}

impl<T> Default for Fifo<T> {
    fn default() -> Self {
        Fifo { items: VecDeque::new() }
    }
}

impl<T> Fifo<T> {
    /// Builds an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues an item at the tail.
    pub fn push(&mut self, item: T) {
        self.items.push_back(item);
    }

    /// Removes and returns the item at the head, if any.
    pub fn pop(&mut self) -> Option<T> {
        self.items.pop_front()
    }

    /// Returns the item at the head without removing it.
    pub fn peek(&self) -> Option<&T> {
        self.items.front()
    }

    /// Number of items currently queued.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the queue holds no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use perseo_core::{NeuronId, Spike, Timex};

    #[test]
    fn preserves_arrival_order() {
        let mut q = Fifo::new();
        q.push(Spike::new(Timex::from_millis(1.0), NeuronId::new(0), 0.0));
        q.push(Spike::new(Timex::from_millis(2.0), NeuronId::new(1), 0.0));
        assert_eq!(q.pop().unwrap().neuron, NeuronId::new(0));
        assert_eq!(q.pop().unwrap().neuron, NeuronId::new(1));
        assert!(q.pop().is_none());
    }

    #[test]
    fn peek_does_not_remove() {
        let mut q = Fifo::new();
        q.push(Spike::new(Timex::ZERO, NeuronId::new(3), 0.0));
        assert_eq!(q.peek().unwrap().neuron, NeuronId::new(3));
        assert_eq!(q.len(), 1);
    }
}

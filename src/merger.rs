//! Binary heap merger.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::io;

/// Binary heap merger implementation.
/// Merges multiple sorted element streams into a single sorted output.
/// Memory use is proportional to the number of sources, not to their length.
/// Time complexity is *m* \* log(*n*) in worst case where *m* is the number
/// of elements, *n* is the number of sources.
pub struct BinaryHeapMerger<C>
where
    C: IntoIterator<Item = io::Result<i32>>,
{
    // binary heap is max-heap by default so we reverse it to convert it to min-heap
    items: BinaryHeap<(Reverse<i32>, usize)>,
    sources: Vec<C::IntoIter>,
    initiated: bool,
}

impl<C> BinaryHeapMerger<C>
where
    C: IntoIterator<Item = io::Result<i32>>,
{
    /// Creates an instance of a binary heap merger using the provided sources.
    /// Source items should be sorted in ascending order otherwise the result
    /// is undefined.
    ///
    /// # Arguments
    /// * `sources` - Sorted streams to be merged into a single sorted one
    pub fn new<I>(sources: I) -> Self
    where
        I: IntoIterator<Item = C>,
    {
        let sources = Vec::from_iter(sources.into_iter().map(|s| s.into_iter()));
        let items = BinaryHeap::with_capacity(sources.len());

        return BinaryHeapMerger {
            sources,
            items,
            initiated: false,
        };
    }
}

impl<C> Iterator for BinaryHeapMerger<C>
where
    C: IntoIterator<Item = io::Result<i32>>,
{
    type Item = io::Result<i32>;

    /// Returns the next element from the sources in ascending order.
    fn next(&mut self) -> Option<Self::Item> {
        if !self.initiated {
            for (idx, source) in self.sources.iter_mut().enumerate() {
                if let Some(item) = source.next() {
                    match item {
                        Ok(value) => self.items.push((Reverse(value), idx)),
                        Err(err) => return Some(Err(err)),
                    }
                }
            }
            self.initiated = true;
        }

        let (result, idx) = self.items.pop()?;
        if let Some(item) = self.sources[idx].next() {
            match item {
                Ok(value) => self.items.push((Reverse(value), idx)),
                Err(err) => return Some(Err(err)),
            }
        }

        return Some(Ok(result.0));
    }
}

//! Chunked bump arena for BVH nodes.
//!
//! Nodes are appended into fixed-capacity chunks sized to one 4 KiB page.
//! A full chunk is never grown in place, so a node's address is stable for
//! the arena's whole life. There is no per-node free; the arena is dropped
//! together with the tree.

use crate::error::BvhError;

const PAGE_SIZE: usize = 4096;

/// Stable handle to a node allocated from a [`NodeArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

pub struct NodeArena<T> {
    chunks: Vec<Vec<T>>,
    chunk_capacity: usize,
    len: usize,
}

impl<T> NodeArena<T> {
    /// Arena whose chunks each hold one page worth of `T`.
    pub fn new() -> Self {
        let per_page = PAGE_SIZE / std::mem::size_of::<T>().max(1);
        Self::with_chunk_capacity(per_page)
    }

    pub fn with_chunk_capacity(chunk_capacity: usize) -> Self {
        Self {
            chunks: Vec::new(),
            chunk_capacity: chunk_capacity.max(1),
            len: 0,
        }
    }

    /// Store `value` and return its handle.
    pub fn alloc(&mut self, value: T) -> Result<NodeId, BvhError> {
        let id = u32::try_from(self.len).map_err(|_| BvhError::ArenaExhausted)?;

        let needs_chunk = self
            .chunks
            .last()
            .map_or(true, |chunk| chunk.len() == self.chunk_capacity);
        if needs_chunk {
            self.grow()?;
        }

        // grow() guarantees a chunk with spare room
        let chunk = self.chunks.last_mut().ok_or(BvhError::ArenaExhausted)?;
        chunk.push(value);
        self.len += 1;
        Ok(NodeId(id))
    }

    fn grow(&mut self) -> Result<(), BvhError> {
        let mut chunk = Vec::new();
        chunk
            .try_reserve_exact(self.chunk_capacity)
            .map_err(|_| BvhError::ArenaExhausted)?;
        self.chunks
            .try_reserve(1)
            .map_err(|_| BvhError::ArenaExhausted)?;
        self.chunks.push(chunk);
        Ok(())
    }

    #[inline]
    pub fn get(&self, id: NodeId) -> &T {
        let i = id.index();
        &self.chunks[i / self.chunk_capacity][i % self.chunk_capacity]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn chunk_capacity(&self) -> usize {
        self.chunk_capacity
    }
}

impl<T> Default for NodeArena<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_sized_chunks() {
        let arena: NodeArena<[u64; 4]> = NodeArena::new();
        assert_eq!(arena.chunk_capacity(), 4096 / 32);
        assert!(arena.is_empty());
        assert_eq!(arena.chunk_count(), 0);
    }

    #[test]
    fn test_ids_are_sequential_and_resolve() {
        let mut arena = NodeArena::with_chunk_capacity(3);
        let ids: Vec<NodeId> = (0..10).map(|i| arena.alloc(i * 10).unwrap()).collect();

        assert_eq!(arena.len(), 10);
        assert_eq!(arena.chunk_count(), 4);
        for (i, id) in ids.iter().enumerate() {
            assert_eq!(id.index(), i);
            assert_eq!(*arena.get(*id), i * 10);
        }
    }

    #[test]
    fn test_growth_does_not_move_nodes() {
        let mut arena = NodeArena::with_chunk_capacity(4);
        let first = arena.alloc(String::from("root")).unwrap();
        let before = arena.get(first) as *const String;

        for i in 0..1000 {
            arena.alloc(i.to_string()).unwrap();
        }

        let after = arena.get(first) as *const String;
        assert_eq!(before, after);
        assert_eq!(arena.get(first), "root");
    }
}

//! Bump allocation for values whose lifetime is tied to one compile or one
//! VM invocation.
//!
//! The scanner, parser and compiler never need an arena — their AST and
//! bytecode are owned, growable `Vec`s. The VM does: every `QUERY` opcode
//! builds a handful of `QMbase`-shaped operand structs that only need to
//! live for the duration of one `q_match` call. Rather than allocate and
//! free each one individually, the VM bump-allocates them from an
//! [`Arena`] that is dropped in one shot when the call returns.

use bumpalo::Bump;

/// A bump allocator for short-lived, arena-scoped references.
///
/// Values allocated in an arena live until the arena is dropped or reset.
pub struct Arena<T> {
    bump: Bump,
    _marker: std::marker::PhantomData<T>,
}

impl<T> Arena<T> {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Arena {
            bump: Bump::new(),
            _marker: std::marker::PhantomData,
        }
    }

    /// Allocates a value and returns a reference valid for the arena's lifetime.
    pub fn alloc(&self, value: T) -> &T {
        self.bump.alloc(value)
    }

    /// Allocates a slice from an iterator.
    pub fn alloc_slice<I>(&self, items: I) -> &[T]
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: ExactSizeIterator,
    {
        self.bump.alloc_slice_fill_iter(items)
    }

    /// Resets the arena, invalidating all references but keeping allocated capacity.
    pub fn reset(&mut self) {
        self.bump.reset();
    }

    /// Bytes currently reserved by the underlying bump allocator.
    pub fn allocated_bytes(&self) -> usize {
        self.bump.allocated_bytes()
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_returns_stable_reference() {
        let arena: Arena<i32> = Arena::new();
        let r1 = arena.alloc(42);
        let r2 = arena.alloc(100);
        assert_eq!(*r1, 42);
        assert_eq!(*r2, 100);
    }

    #[test]
    fn reset_keeps_capacity() {
        let mut arena: Arena<i32> = Arena::new();
        arena.alloc(1);
        let before = arena.allocated_bytes();
        arena.reset();
        assert!(arena.allocated_bytes() <= before);
    }

    #[test]
    fn alloc_slice_from_vec() {
        let arena: Arena<i32> = Arena::new();
        let vec = vec![10, 20, 30];
        let slice = arena.alloc_slice(vec);
        assert_eq!(slice, &[10, 20, 30]);
    }
}

//! Scratch arena: per-search scoped allocation for the per-token arrays the
//! Coverage Engine needs (one pooled buffer reused across candidates,
//! released on every exit path — normal, timeout, filter rejection, or
//! error).
//!
//! Uses a "stack buffer if small, pooled otherwise" allocation shape
//! recurring across the corpus's streaming search paths, generalized here
//! into a standalone arena rather than inlined per call site.

const STACK_THRESHOLD: usize = 256;

/// A reusable row buffer for per-token arrays. Rows at or below
/// `STACK_THRESHOLD` elements are served from an internal pool rather than
/// allocating a fresh `Vec` per candidate.
pub struct ScratchArena {
    pool: Vec<Vec<f64>>,
}

impl ScratchArena {
    pub fn new() -> Self {
        ScratchArena { pool: Vec::new() }
    }

    /// Checks out a zeroed row of at least `len` elements. Returned as a
    /// `ScratchRow` scope guard: dropping it returns the buffer to the pool
    /// automatically, so every exit path (including early returns on
    /// timeout) releases it without explicit bookkeeping.
    pub fn checkout(&mut self, len: usize) -> ScratchRow<'_> {
        let mut buf = if len <= STACK_THRESHOLD {
            self.pool.pop().unwrap_or_default()
        } else {
            Vec::new()
        };
        buf.clear();
        buf.resize(len, 0.0);
        ScratchRow { arena: self, buf: Some(buf) }
    }
}

impl Default for ScratchArena {
    fn default() -> Self {
        Self::new()
    }
}

pub struct ScratchRow<'a> {
    arena: &'a mut ScratchArena,
    buf: Option<Vec<f64>>,
}

impl<'a> std::ops::Deref for ScratchRow<'a> {
    type Target = [f64];
    fn deref(&self) -> &[f64] {
        self.buf.as_deref().unwrap()
    }
}

impl<'a> std::ops::DerefMut for ScratchRow<'a> {
    fn deref_mut(&mut self) -> &mut [f64] {
        self.buf.as_deref_mut().unwrap()
    }
}

impl<'a> Drop for ScratchRow<'a> {
    fn drop(&mut self) {
        if let Some(buf) = self.buf.take() {
            if buf.len() <= STACK_THRESHOLD {
                self.arena.pool.push(buf);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkout_returns_zeroed_row_of_requested_length() {
        let mut arena = ScratchArena::new();
        let row = arena.checkout(10);
        assert_eq!(row.len(), 10);
        assert!(row.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn row_is_released_back_to_pool_on_drop() {
        let mut arena = ScratchArena::new();
        {
            let _row = arena.checkout(10);
        }
        assert_eq!(arena.pool.len(), 1);
    }
}

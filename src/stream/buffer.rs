//! Accuracy-first content buffering.
//!
//! While any tool call is executing, prose from the model may still be
//! revised by whatever the tool returns, so it is withheld. The moment no
//! call is executing the backlog must be released, in arrival order; holding
//! it any longer is a policy violation, not an option.

/// Pending content fragments plus the block flag that gates their release.
///
/// Invariant: when `blocked` is false the pending list is empty.
#[derive(Debug, Default)]
pub struct ContentBuffer {
    pending: Vec<String>,
    blocked: bool,
}

impl ContentBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_blocked(&self) -> bool {
        self.blocked
    }

    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Accept one content fragment. Returns the fragments that are safe to
    /// deliver right now, in arrival order; empty while blocked.
    pub fn accept(&mut self, text: String) -> Vec<String> {
        if self.blocked {
            self.pending.push(text);
            return Vec::new();
        }
        // Unblocked: the backlog is empty by invariant, but draining it here
        // keeps delivery correct even if a flush opportunity was missed.
        let mut out = std::mem::take(&mut self.pending);
        out.push(text);
        out
    }

    /// Re-evaluate the block flag. A blocked→unblocked transition returns
    /// the entire backlog, which the caller must deliver immediately.
    pub fn set_blocked(&mut self, blocked: bool) -> Vec<String> {
        let was_blocked = self.blocked;
        self.blocked = blocked;
        if was_blocked && !blocked {
            std::mem::take(&mut self.pending)
        } else {
            Vec::new()
        }
    }

    /// Drop the backlog without delivering it (cancellation path).
    /// Returns how many fragments were discarded.
    pub fn discard(&mut self) -> usize {
        self.blocked = false;
        std::mem::take(&mut self.pending).len()
    }
}

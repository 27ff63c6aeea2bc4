//! Command batches.

/// An ordered, immutable list of commands destined for one device.
///
/// Batches are built once (by a command builder) and never mutated during
/// execution; the chunker borrows slices out of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandBatch {
    commands: Vec<String>,
}

impl CommandBatch {
    pub fn new(commands: Vec<String>) -> Self {
        Self { commands }
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().map(String::as_str)
    }

    /// Consecutive slices of at most `size` commands, in order. The final
    /// slice holds the remainder.
    pub fn chunks(&self, size: usize) -> impl Iterator<Item = &[String]> {
        self.commands.chunks(size.max(1))
    }

    pub fn as_slice(&self) -> &[String] {
        &self.commands
    }
}

impl FromIterator<String> for CommandBatch {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

use crate::config::Config;
use crate::error::Result;
use crate::sorter::main::WasteSorter;
use once_cell::sync::OnceCell;

/// Process-wide sorter, built at most once and read-only afterwards.
///
/// Concurrent first callers block until one build finishes. A failed build
/// leaves the cell empty so a later call can try again.
pub struct SharedSorter {
    cell: OnceCell<WasteSorter>,
}

pub static SHARED_SORTER: SharedSorter = SharedSorter::new();

impl SharedSorter {
    pub const fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    pub fn get(&self) -> Option<&WasteSorter> {
        self.cell.get()
    }

    pub fn get_or_try_init<F>(&self, build: F) -> Result<&WasteSorter>
    where
        F: FnOnce() -> Result<WasteSorter>,
    {
        self.cell.get_or_try_init(build)
    }

    pub fn get_or_load(&self, config: &Config) -> Result<&WasteSorter> {
        self.get_or_try_init(|| WasteSorter::load(config))
    }
}

impl Default for SharedSorter {
    fn default() -> Self {
        Self::new()
    }
}

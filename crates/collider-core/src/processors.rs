//! Repetition counts derived from the host's available parallelism.
//!
//! Racy bodies surface bugs most often when every worker has its own core,
//! so these are the usual arguments to `times(..)`.

/// Repetition counts scaled to the host.
///
/// Every helper returns at least 1.
#[derive(Debug, Clone, Copy)]
pub struct Processors;

impl Processors {
    /// Number of hardware threads available to the process.
    #[must_use]
    pub fn all() -> i64 {
        std::thread::available_parallelism()
            .map_or(1, |n| i64::try_from(n.get()).unwrap_or(i64::MAX))
    }

    /// Half of [`Processors::all`].
    #[must_use]
    pub fn half() -> i64 {
        Self::fraction(2)
    }

    /// A third of [`Processors::all`].
    #[must_use]
    pub fn one_third() -> i64 {
        Self::fraction(3)
    }

    /// A quarter of [`Processors::all`].
    #[must_use]
    pub fn one_quarter() -> i64 {
        Self::fraction(4)
    }

    fn fraction(divisor: i64) -> i64 {
        (Self::all() / divisor).max(1)
    }
}

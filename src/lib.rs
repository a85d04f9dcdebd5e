//! Tools for inspecting the wave logs written by the base station
//! simulator. A wave log records, for every sample time, the resource usage
//! and power state of each simulated station.
//!
//! The [wave_log] module reads and writes the binary format itself. On top
//! of that there are [summary] statistics, an [export] to CSV or RON, and a
//! [synth] generator for producing logs without running the simulator.
//!
//! Two binaries ship with the crate: `wavelog`, which decodes a log and
//! prints what it found, and `wavegen`, which writes a synthetic log.

#![warn(missing_docs)]
pub mod args;
pub mod config;
pub mod error;
pub mod export;
pub mod record_decoder;
pub mod summary;
pub mod synth;
pub mod wave_log;

/// An iterator that walks a collection of columns row by row, based on
/// [this StackOverflow answer](https://stackoverflow.com/a/75477884/17443903).
/// Iteration stops at the end of the shortest column, or immediately when
/// there are no columns at all.
pub struct TransposeIter<I, T>
where
    I: IntoIterator<Item = T>,
{
    iterators: Vec<I::IntoIter>,
}

#[allow(missing_docs)]
pub trait TransposableIter<I, T>
where
    Self: Sized,
    Self: IntoIterator<Item = I>,
    I: IntoIterator<Item = T>,
{
    fn transpose(self) -> TransposeIter<I, T> {
        let iterators: Vec<_> = self.into_iter().map(|i| i.into_iter()).collect();
        TransposeIter { iterators }
    }
}

impl<I, T> Iterator for TransposeIter<I, T>
where
    I: IntoIterator<Item = T>,
{
    type Item = Vec<T>;
    fn next(&mut self) -> Option<Self::Item> {
        if self.iterators.is_empty() {
            return None;
        }
        self.iterators.iter_mut().map(|iter| iter.next()).collect()
    }
}

impl<I, T, Any> TransposableIter<I, T> for Any
where
    Any: IntoIterator<Item = I>,
    I: IntoIterator<Item = T>,
{
}

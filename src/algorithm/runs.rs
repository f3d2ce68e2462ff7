//! Run-length interval collapse
//!
//! Every builder in the pipeline is a scan over a sorted sequence that keeps
//! an open run and closes it when a boundary predicate trips: overlapping
//! stays, consecutive enrollment months, consecutive observable days. This
//! module implements that scan once.

use chrono::NaiveDate;

use crate::models::{DayRecord, EdPair, NhEpisode};

/// Anything with an inclusive date span
pub trait Span {
    fn start(&self) -> NaiveDate;
    fn end(&self) -> NaiveDate;
}

impl Span for NaiveDate {
    fn start(&self) -> NaiveDate {
        *self
    }

    fn end(&self) -> NaiveDate {
        *self
    }
}

impl Span for EdPair {
    fn start(&self) -> NaiveDate {
        self.entry_date
    }

    fn end(&self) -> NaiveDate {
        self.discharge_date
    }
}

impl Span for NhEpisode {
    fn start(&self) -> NaiveDate {
        self.entry_date
    }

    fn end(&self) -> NaiveDate {
        self.discharge_date
    }
}

impl Span for DayRecord<'_> {
    fn start(&self) -> NaiveDate {
        self.day
    }

    fn end(&self) -> NaiveDate {
        self.day
    }
}

/// A run of consecutive items from a sorted slice
///
/// `start` is the minimum start and `end` the running maximum end over
/// `members`.
#[derive(Debug, Clone, Copy)]
pub struct Run<'a, T> {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub members: &'a [T],
}

impl<'a, T> Run<'a, T> {
    #[must_use]
    pub fn first(&self) -> &'a T {
        &self.members[0]
    }

    #[must_use]
    pub fn last(&self) -> &'a T {
        &self.members[self.members.len() - 1]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Scan state: index of the run's first member and its running bounds
#[derive(Debug, Clone, Copy)]
struct Accumulator {
    from: usize,
    start: NaiveDate,
    end: NaiveDate,
}

impl Accumulator {
    fn open<T: Span>(from: usize, item: &T) -> Self {
        Self {
            from,
            start: item.start(),
            end: item.end(),
        }
    }

    fn run<'a, T>(self, items: &'a [T], to: usize) -> Run<'a, T> {
        Run {
            start: self.start,
            end: self.end,
            members: &items[self.from..to],
        }
    }
}

/// Collapse `items` into runs
///
/// `items` must already be sorted so that members of one run are adjacent.
/// `continues(open_run, next)` decides whether `next` extends the open run;
/// it is never called for the first item. Runs partition `items` in order.
pub fn collapse_runs<'a, T, F>(items: &'a [T], mut continues: F) -> Vec<Run<'a, T>>
where
    T: Span,
    F: FnMut(&Run<'a, T>, &T) -> bool,
{
    let mut runs = Vec::new();
    let mut acc: Option<Accumulator> = None;

    for (i, item) in items.iter().enumerate() {
        acc = Some(match acc {
            None => Accumulator::open(i, item),
            Some(open) => {
                let run = open.run(items, i);
                if continues(&run, item) {
                    Accumulator {
                        from: open.from,
                        start: open.start.min(item.start()),
                        end: open.end.max(item.end()),
                    }
                } else {
                    runs.push(run);
                    Accumulator::open(i, item)
                }
            }
        });
    }

    if let Some(open) = acc {
        runs.push(open.run(items, items.len()));
    }
    runs
}

/// `next` starts on or before the last day of the open run
#[must_use]
pub fn overlaps<T, U: Span>(run: &Run<'_, T>, next: &U) -> bool {
    next.start() <= run.end
}

/// `next` starts exactly one day after the open run ends
#[must_use]
pub fn follows<T, U: Span>(run: &Run<'_, T>, next: &U) -> bool {
    run.end.succ_opt() == Some(next.start())
}

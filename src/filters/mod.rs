//! Signal shaping filters and the registry that resolves them by name.
//!
//! Every dispatch path degrades to "none", i.e. the input comes back unchanged:
//! unknown names, out of range selector indices, missing contexts and contexts
//! that belong to another filter variant.

mod lossy_peak;

pub use lossy_peak::{LossyPeak, Phase};

use embassy_time::Instant;

use crate::errors::FanTachError;

/// Longest argument text any filter prints
pub const FILTER_ARGS_MAX_LEN: usize = 128;

pub type FilterArgs = heapless::String<FILTER_ARGS_MAX_LEN>;

/// Behaviour shared by every stateful filter
pub trait SignalFilter {
    /// Feeds one sample taken at `now` and returns the filtered value.
    fn filter(&mut self, input: f32, now: Instant) -> f32;
    /// Arguments in the same format `FilterKind::parse_args` accepts.
    fn print_args(&self) -> Option<FilterArgs>;
}

/// Filter selector
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FilterKind {
    #[default]
    None,
    LossyPeak,
}

struct FilterEntry {
    kind: FilterKind,
    name: &'static str,
}

/// Indexed by selector number; adding a variant means adding a row here and a match arm in `parse_args`.
const FILTERS: [FilterEntry; 2] = [
    FilterEntry { kind: FilterKind::None, name: "none" },
    FilterEntry { kind: FilterKind::LossyPeak, name: "lossypeak" },
];

impl FilterKind {
    /// Case insensitive lookup. Anything unknown is "none".
    pub fn from_name(name: &str) -> Self {
        FILTERS
            .iter()
            .find(|entry| entry.name.eq_ignore_ascii_case(name))
            .map(|entry| entry.kind)
            .unwrap_or(FilterKind::None)
    }

    /// Selector number to kind, out of range is "none".
    pub fn from_index(index: usize) -> Self {
        FILTERS
            .get(index)
            .map(|entry| entry.kind)
            .unwrap_or(FilterKind::None)
    }

    pub fn index(self) -> usize {
        FILTERS
            .iter()
            .position(|entry| entry.kind == self)
            .unwrap_or(0)
    }

    pub fn name(self) -> &'static str {
        FILTERS[self.index()].name
    }

    /// Builds a fresh context for this filter from its argument text.
    pub fn parse_args(self, args: Option<&str>, now: Instant) -> Result<FilterContext, FanTachError> {
        match self {
            FilterKind::None => Err(FanTachError::FilterTakesNoArgs()),
            FilterKind::LossyPeak => {
                let args = args.ok_or(FanTachError::MissingFilterArgs())?;
                Ok(FilterContext::LossyPeak(LossyPeak::parse_args(args, now)?))
            }
        }
    }

    /// Prints the arguments of `ctx`; `None` for "none" or a context of another variant.
    pub fn print_args(self, ctx: Option<&FilterContext>) -> Option<FilterArgs> {
        match (self, ctx?) {
            (FilterKind::LossyPeak, FilterContext::LossyPeak(c)) => c.print_args(),
            _ => None,
        }
    }

    /// Runs `input` through the filter, or hands it back untouched when there is nothing to run.
    pub fn apply(self, ctx: Option<&mut FilterContext>, input: f32, now: Instant) -> f32 {
        match (self, ctx) {
            (FilterKind::LossyPeak, Some(FilterContext::LossyPeak(c))) => c.filter(input, now),
            _ => input,
        }
    }
}

/// Per instance state of a filter
#[derive(Clone, Debug, PartialEq)]
pub enum FilterContext {
    LossyPeak(LossyPeak),
}

impl FilterContext {
    pub fn kind(&self) -> FilterKind {
        match self {
            FilterContext::LossyPeak(_) => FilterKind::LossyPeak,
        }
    }
}

/// A selector together with the context it owns: one filtered signal.
#[derive(Clone, Debug, Default)]
pub struct PwmFilter {
    kind: FilterKind,
    ctx: Option<FilterContext>,
}

impl PwmFilter {
    /// Filter that passes everything through
    pub const fn none() -> Self {
        Self { kind: FilterKind::None, ctx: None }
    }

    /// Builds the filter named `name` with `args`. "none" never needs arguments.
    pub fn new(kind: FilterKind, args: Option<&str>, now: Instant) -> Result<Self, FanTachError> {
        let ctx = match kind {
            FilterKind::None => None,
            _ => Some(kind.parse_args(args, now)?),
        };
        Ok(Self { kind, ctx })
    }

    /// Like `new`, but a filter whose arguments are rejected turns into "none".
    pub fn from_config(name: &str, args: &str, now: Instant) -> Self {
        let kind = FilterKind::from_name(name);
        match Self::new(kind, Some(args), now) {
            Ok(filter) => filter,
            Err(e) => {
                warn!("Bad arguments for filter {}: {:?}, not filtering", kind.name(), e);
                Self::none()
            }
        }
    }

    pub fn kind(&self) -> FilterKind {
        self.kind
    }

    pub fn args(&self) -> Option<FilterArgs> {
        self.kind.print_args(self.ctx.as_ref())
    }

    pub fn apply(&mut self, input: f32, now: Instant) -> f32 {
        self.kind.apply(self.ctx.as_mut(), input, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_resolve_case_insensitively() {
        assert_eq!(FilterKind::from_name("lossypeak"), FilterKind::LossyPeak);
        assert_eq!(FilterKind::from_name("LossyPeak"), FilterKind::LossyPeak);
        assert_eq!(FilterKind::from_name("NONE"), FilterKind::None);
    }

    #[test]
    fn unknown_names_resolve_to_none() {
        assert_eq!(FilterKind::from_name("median"), FilterKind::None);
        assert_eq!(FilterKind::from_name(""), FilterKind::None);
        assert_eq!(FilterKind::from_name("lossypeak "), FilterKind::None);
    }

    #[test]
    fn index_and_name_round_trip() {
        for index in 0..FILTERS.len() {
            let kind = FilterKind::from_index(index);
            assert_eq!(kind.index(), index);
            assert_eq!(FilterKind::from_name(kind.name()), kind);
        }
        assert_eq!(FilterKind::from_index(2), FilterKind::None);
        assert_eq!(FilterKind::from_index(usize::MAX).name(), "none");
    }

    #[test]
    fn none_has_no_parser_or_printer() {
        let now = Instant::from_ticks(0);
        assert_eq!(
            FilterKind::None.parse_args(Some("1,2"), now),
            Err(FanTachError::FilterTakesNoArgs())
        );
        let ctx = FilterKind::LossyPeak.parse_args(Some("1,2"), now).unwrap();
        assert_eq!(FilterKind::None.print_args(Some(&ctx)), None);
    }

    #[test]
    fn lossypeak_needs_arguments() {
        assert_eq!(
            FilterKind::LossyPeak.parse_args(None, Instant::from_ticks(0)),
            Err(FanTachError::MissingFilterArgs())
        );
    }

    #[test]
    fn apply_without_context_is_identity() {
        let now = Instant::from_ticks(0);
        assert_eq!(FilterKind::LossyPeak.apply(None, 3.5, now), 3.5);
        assert_eq!(FilterKind::None.apply(None, -1.25, now), -1.25);
    }

    #[test]
    fn mismatched_selector_is_identity() {
        let now = Instant::from_ticks(0);
        let mut ctx = FilterKind::LossyPeak.parse_args(Some("1.0,0"), now).unwrap();
        ctx_feed(&mut ctx, 50.0, now);
        assert_eq!(FilterKind::None.apply(Some(&mut ctx), 7.0, now), 7.0);
        assert_eq!(FilterKind::from_index(9).apply(Some(&mut ctx), 7.0, now), 7.0);
    }

    fn ctx_feed(ctx: &mut FilterContext, input: f32, now: Instant) {
        let kind = ctx.kind();
        kind.apply(Some(ctx), input, now);
    }

    #[test]
    fn bad_config_falls_back_to_none() {
        let mut filter = PwmFilter::from_config("lossypeak", "fast,slow", Instant::from_ticks(0));
        assert_eq!(filter.kind(), FilterKind::None);
        assert_eq!(filter.apply(12.0, Instant::from_millis(5)), 12.0);
        assert_eq!(filter.args(), None);
    }

    #[test]
    fn none_filter_ignores_arguments() {
        let filter = PwmFilter::from_config("none", "whatever", Instant::from_ticks(0));
        assert_eq!(filter.kind(), FilterKind::None);
    }
}

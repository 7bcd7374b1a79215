use crate::SequenceConfig;

/// How a segment relates to the row it was carved from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SegmentKind {
    /// No row yet: insert the first segment.
    Create,
    /// A full `step` past the stored value.
    Advance,
    /// The last, shortened segment before `max_value`.
    Partial,
    /// `max_value` is spent: reset the row to the first segment.
    Wrap,
}

/// One planned store write and the range it reserves if it lands.
///
/// `finish` doubles as the value written to the row. `current` is the value
/// read beforehand; for anything but [`SegmentKind::Create`] it is the
/// expected value of the conditional update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SegmentPlan {
    pub kind: SegmentKind,
    pub current: Option<i64>,
    pub start: i64,
    pub finish: i64,
}

/// Decides the next segment given the row's current high-water mark.
pub(crate) fn plan_segment(current: Option<i64>, config: &SequenceConfig) -> SegmentPlan {
    let min_value = config.min_value();
    let max_value = config.max_value();
    let first_end = config.first_segment_end();

    let Some(value) = current else {
        return SegmentPlan {
            kind: SegmentKind::Create,
            current,
            start: min_value,
            finish: first_end,
        };
    };

    // An i64 overflow of `value + step` counts as running past max_value.
    let (kind, start, finish) = match value.checked_add(config.step()) {
        Some(advanced) if advanced <= max_value => (SegmentKind::Advance, value + 1, advanced),
        _ if max_value > value => (SegmentKind::Partial, value + 1, max_value),
        _ => (SegmentKind::Wrap, min_value, first_end),
    };

    SegmentPlan {
        kind,
        current,
        start,
        finish,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(min: i64, max: i64, step: i64) -> SequenceConfig {
        SequenceConfig::default()
            .with_min_value(min)
            .unwrap()
            .with_max_value(max)
            .unwrap()
            .with_step(step)
            .unwrap()
    }

    fn bounds(plan: SegmentPlan) -> (SegmentKind, i64, i64) {
        (plan.kind, plan.start, plan.finish)
    }

    #[test]
    fn absent_row_gets_first_segment() {
        let plan = plan_segment(None, &config(1, 100, 5));
        assert_eq!(bounds(plan), (SegmentKind::Create, 1, 5));
        assert_eq!(plan.current, None);

        let plan = plan_segment(None, &config(1000, 5000, 10));
        assert_eq!(bounds(plan), (SegmentKind::Create, 1000, 1009));
    }

    #[test]
    fn advances_by_full_step() {
        let plan = plan_segment(Some(5), &config(1, 100, 5));
        assert_eq!(bounds(plan), (SegmentKind::Advance, 6, 10));
        assert_eq!(plan.current, Some(5));
    }

    #[test]
    fn exact_fit_at_max_is_a_full_step() {
        let plan = plan_segment(Some(5), &config(1, 10, 5));
        assert_eq!(bounds(plan), (SegmentKind::Advance, 6, 10));
    }

    #[test]
    fn clamps_last_segment_to_max() {
        let plan = plan_segment(Some(9), &config(1, 12, 5));
        assert_eq!(bounds(plan), (SegmentKind::Partial, 10, 12));
    }

    #[test]
    fn wraps_once_max_is_spent() {
        let plan = plan_segment(Some(10), &config(1, 10, 5));
        assert_eq!(bounds(plan), (SegmentKind::Wrap, 1, 5));
        assert_eq!(plan.current, Some(10));
    }

    #[test]
    fn wraps_when_stored_value_exceeds_max() {
        // A row written under a larger max_value.
        let plan = plan_segment(Some(500), &config(1, 10, 5));
        assert_eq!(bounds(plan), (SegmentKind::Wrap, 1, 5));
    }

    #[test]
    fn step_overflow_is_treated_as_past_max() {
        let plan = plan_segment(Some(i64::MAX - 2), &config(1, i64::MAX, i64::MAX / 2));
        assert_eq!(bounds(plan), (SegmentKind::Partial, i64::MAX - 1, i64::MAX));

        let plan = plan_segment(Some(i64::MAX), &config(1, i64::MAX, 3));
        assert_eq!(bounds(plan), (SegmentKind::Wrap, 1, 3));
    }
}

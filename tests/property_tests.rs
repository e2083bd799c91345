//! Property-based tests for live_table.
//!
//! Verifies the width arithmetic and the table's layout invariants over
//! generated inputs.

mod common;

use proptest::prelude::*;

use common::{SharedBuffer, status_table};
use live_table::cells::{Align, align, ellipsis, ellipsis_with, truncate, width};
use live_table::functions::flag;
use live_table::{Fields, Value};

// ============================================================================
// Custom Strategies
// ============================================================================

/// Generate ASCII text (simpler than full Unicode for basic tests).
fn ascii_text() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{0,60}"
}

/// Mix of narrow and wide characters without combining marks.
fn mixed_text() -> impl Strategy<Value = String> {
    "[a-z0-9 中文字表]{0,40}"
}

/// Text wrapped in SGR sequences.
fn styled_text() -> impl Strategy<Value = (String, String)> {
    (mixed_text(), 0u8..108u8).prop_map(|(text, code)| {
        let styled = format!("\x1b[{code}m{text}\x1b[0m");
        (text, styled)
    })
}

fn any_align() -> impl Strategy<Value = Align> {
    prop_oneof![Just(Align::Left), Just(Align::Right), Just(Align::Center)]
}

// ============================================================================
// Width arithmetic
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// ASCII text is one cell per character.
    #[test]
    fn prop_ascii_width_is_length(text in ascii_text()) {
        prop_assert_eq!(width(&text), text.len());
    }

    /// Escape sequences occupy no cells.
    #[test]
    fn prop_escapes_are_zero_width((plain, styled) in styled_text()) {
        prop_assert_eq!(width(&styled), width(&plain));
    }

    /// Widths add up across concatenation.
    #[test]
    fn prop_width_is_additive(a in mixed_text(), b in mixed_text()) {
        prop_assert_eq!(width(&format!("{a}{b}")), width(&a) + width(&b));
    }

    /// Truncation never exceeds the budget and is a no-op when text fits.
    #[test]
    fn prop_truncate_respects_budget(text in mixed_text(), max in 0usize..50) {
        let cut = truncate(&text, max);
        prop_assert!(width(&cut) <= max);
        if width(&text) <= max {
            prop_assert_eq!(cut, text);
        } else {
            prop_assert!(text.starts_with(&cut));
            // A wide character may leave at most one cell unused.
            prop_assert!(width(&cut) + 1 >= max);
        }
    }

    /// Truncation is idempotent.
    #[test]
    fn prop_truncate_idempotent(text in mixed_text(), max in 0usize..50) {
        let once = truncate(&text, max);
        prop_assert_eq!(truncate(&once, max), once);
    }

    /// A marker wider than the budget is rejected.
    #[test]
    fn prop_oversized_marker_rejected(text in ascii_text(), marker in "[a-z中]{1,8}", max in 0usize..8) {
        let result = ellipsis_with(&text, max, &marker);
        if width(&marker) > max {
            prop_assert!(result.is_err());
            prop_assert!(result.unwrap_err().is_invalid_argument());
        } else {
            prop_assert!(result.is_ok());
        }
    }

    /// Truncating styled text keeps the visible prefix of the plain text.
    #[test]
    fn prop_truncate_styled_matches_plain((plain, styled) in styled_text(), max in 0usize..50) {
        let cut = truncate(&styled, max);
        prop_assert_eq!(width(&cut), width(&truncate(&plain, max)));
    }

    /// Ellipsis output fits and is marked when shortened.
    #[test]
    fn prop_ellipsis_fits(text in mixed_text(), max in 1usize..50) {
        let out = ellipsis(&text, max).expect("budget holds the marker");
        prop_assert!(width(&out) <= max);
        if width(&text) > max {
            prop_assert!(out.ends_with('\u{2026}'), "output should end with an ellipsis");
        } else {
            prop_assert_eq!(out, text);
        }
    }

    /// Padding reaches the target and never truncates.
    #[test]
    fn prop_align_width(text in mixed_text(), target in 0usize..60, mode in any_align()) {
        let out = align(&text, target, mode);
        prop_assert_eq!(width(&out), width(&text).max(target));
        prop_assert!(out.contains(text.as_str()));
    }
}

// ============================================================================
// Table layout
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Every row's status fits its column after any sequence of updates.
    #[test]
    fn prop_established_width_covers_every_row(
        updates in prop::collection::vec((0usize..4, mixed_text()), 1..30)
    ) {
        let buffer = SharedBuffer::new();
        let table = status_table(&buffer, 500);
        for id in 0..4 {
            table.append(Fields::new().with("id", id)).expect("append");
        }
        for (id, status) in updates {
            table
                .update(Fields::new().with("id", id).with("status", status))
                .expect("update");
        }

        let established = table.established_width("status").expect("column exists");
        for row in table.rows() {
            let status = row.get("status").map(Value::to_string).unwrap_or_default();
            prop_assert!(width(&status) <= established);
        }
    }

    /// Shifts always number the rows from the bottom.
    #[test]
    fn prop_shifts_count_from_bottom(count in 1usize..12) {
        let buffer = SharedBuffer::new();
        let table = status_table(&buffer, 80);
        for id in 0..count {
            table.append(Fields::new().with("id", id)).expect("append");
        }
        let shifts: Vec<usize> = table.rows().iter().map(|r| r.shift()).collect();
        let expected: Vec<usize> = (1..=count).rev().collect();
        prop_assert_eq!(shifts, expected);
    }

    /// After a full render, active rows precede finished ones, each group by start.
    #[test]
    fn prop_active_rows_first(finish in prop::collection::vec(any::<bool>(), 1..10)) {
        let buffer = SharedBuffer::new();
        let table = status_table(&buffer, 80).inactive_when(flag("done"));
        for id in 0..finish.len() {
            table.append(Fields::new().with("id", id)).expect("append");
        }
        for (id, done) in finish.iter().enumerate() {
            if *done {
                table.update(Fields::new().with("id", id).with("done", true)).expect("update");
            }
        }
        table.refresh().expect("refresh");

        let rows = table.rows();
        let first_inactive = rows.iter().position(|r| !r.is_active()).unwrap_or(rows.len());
        prop_assert!(rows[first_inactive..].iter().all(|r| !r.is_active()));
        for group in [&rows[..first_inactive], &rows[first_inactive..]] {
            prop_assert!(group.windows(2).all(|w| w[0].started() <= w[1].started()));
        }
    }
}

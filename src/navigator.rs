//! Spatial navigation over a paginated grid
//!
//! Directional input moves focus through a row-major grid whose column count
//! is injected by the caller. Left/Right step by one, Up/Down step by a whole
//! row. Nothing wraps.

/// Directional remote input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// Result of resolving one directional input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavStep {
    /// Focus moves to this index
    Moved(usize),
    /// Input rejected, focus stays where it was
    Unchanged,
    /// Down on the last row: focus stays, caller should try to load more
    EdgeBelow,
}

/// Compute where focus goes after `direction`.
///
/// With no current focus any direction lands on the first element.
pub fn compute_next_index(
    current: Option<usize>,
    direction: Direction,
    len: usize,
    columns: usize,
) -> NavStep {
    if len == 0 {
        return NavStep::Unchanged;
    }
    let columns = columns.max(1);
    let current = match current {
        Some(i) => i.min(len - 1),
        None => return NavStep::Moved(0),
    };

    let target = match direction {
        Direction::Left => current.checked_sub(1),
        Direction::Right => Some(current + 1).filter(|&t| t < len),
        Direction::Up => current.checked_sub(columns),
        Direction::Down => {
            let below = current + columns;
            if below < len {
                Some(below)
            } else if last_row_start(len, columns) > row_start(current, columns) {
                // A shorter row exists below: land on its last item
                Some(len - 1)
            } else {
                return NavStep::EdgeBelow;
            }
        }
    };

    match target {
        Some(t) if t != current => NavStep::Moved(t),
        _ => NavStep::Unchanged,
    }
}

/// Convenience form returning the resulting focus index
pub fn next_index(
    current: Option<usize>,
    direction: Direction,
    len: usize,
    columns: usize,
) -> Option<usize> {
    match compute_next_index(current, direction, len, columns) {
        NavStep::Moved(i) => Some(i),
        NavStep::Unchanged | NavStep::EdgeBelow => current.map(|c| c.min(len.saturating_sub(1))),
    }
}

fn row_start(index: usize, columns: usize) -> usize {
    index - index % columns
}

fn last_row_start(len: usize, columns: usize) -> usize {
    row_start(len - 1, columns)
}

/// How the focusable list was replaced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListChange {
    /// Fresh first page; optionally restore a remembered focus (back navigation)
    FirstPage { restore: Option<usize> },
    /// Items appended by lazy loading; focus is preserved
    Append,
}

/// Focus position plus the column count of the active layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigationState {
    pub focused: Option<usize>,
    pub columns: usize,
}

impl Default for NavigationState {
    fn default() -> Self {
        Self {
            focused: None,
            columns: 1,
        }
    }
}

impl NavigationState {
    pub fn new(columns: usize) -> Self {
        Self {
            focused: None,
            columns: columns.max(1),
        }
    }

    pub fn set_columns(&mut self, columns: usize) {
        self.columns = columns.max(1);
    }

    /// Resolve `direction` and apply it. Returns the raw step so the caller
    /// can run the pagination path.
    pub fn navigate(&mut self, direction: Direction, len: usize) -> NavStep {
        let step = compute_next_index(self.focused, direction, len, self.columns);
        if let NavStep::Moved(i) = step {
            self.focused = Some(i);
        }
        step
    }

    /// Keep the invariant after the element list was replaced
    pub fn on_list_changed(&mut self, change: ListChange, len: usize) {
        if len == 0 {
            self.focused = None;
            return;
        }
        self.focused = match change {
            ListChange::FirstPage { restore } => Some(restore.unwrap_or(0).min(len - 1)),
            ListChange::Append => Some(self.focused.unwrap_or(0).min(len - 1)),
        };
    }

    /// Focus a specific index, clamped to the list
    pub fn focus(&mut self, index: usize, len: usize) {
        self.focused = if len == 0 {
            None
        } else {
            Some(index.min(len - 1))
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Direction::*;

    #[test]
    fn test_left_right_clamp_without_wrap() {
        assert_eq!(compute_next_index(Some(0), Left, 5, 1), NavStep::Unchanged);
        assert_eq!(compute_next_index(Some(4), Right, 5, 1), NavStep::Unchanged);
        assert_eq!(compute_next_index(Some(2), Right, 5, 3), NavStep::Moved(3));
        assert_eq!(compute_next_index(Some(3), Left, 5, 3), NavStep::Moved(2));
    }

    #[test]
    fn test_grid_up_down() {
        // 6 items, 3 columns, focus at row 2 col 1
        assert_eq!(compute_next_index(Some(3), Up, 6, 3), NavStep::Moved(0));
        assert_eq!(compute_next_index(Some(0), Down, 6, 3), NavStep::Moved(3));
        assert_eq!(compute_next_index(Some(1), Up, 6, 3), NavStep::Unchanged);
        assert_eq!(compute_next_index(Some(3), Down, 6, 3), NavStep::EdgeBelow);
    }

    #[test]
    fn test_down_into_short_last_row() {
        // 7 items, 3 columns: rows [0..3) [3..6) [6]
        assert_eq!(compute_next_index(Some(4), Down, 7, 3), NavStep::Moved(6));
        assert_eq!(compute_next_index(Some(6), Down, 7, 3), NavStep::EdgeBelow);
    }

    #[test]
    fn test_no_focus_lands_on_first() {
        assert_eq!(compute_next_index(None, Down, 3, 3), NavStep::Moved(0));
        assert_eq!(compute_next_index(None, Up, 0, 3), NavStep::Unchanged);
    }

    #[test]
    fn test_never_out_of_bounds() {
        for len in 1..=13 {
            for columns in 1..=5 {
                for current in 0..len {
                    for dir in [Up, Down, Left, Right] {
                        if let NavStep::Moved(i) =
                            compute_next_index(Some(current), dir, len, columns)
                        {
                            assert!(i < len, "len={len} cols={columns} cur={current} {dir:?}");
                        }
                        let idx = next_index(Some(current), dir, len, columns);
                        assert!(matches!(idx, Some(i) if i < len));
                    }
                }
            }
        }
    }

    #[test]
    fn test_stale_focus_is_clamped_first() {
        // Focus beyond the list (list shrank) is treated as the last item
        assert_eq!(compute_next_index(Some(10), Left, 4, 1), NavStep::Moved(2));
    }

    #[test]
    fn test_first_page_resets_and_append_preserves() {
        let mut nav = NavigationState::new(3);
        nav.on_list_changed(ListChange::FirstPage { restore: None }, 6);
        assert_eq!(nav.focused, Some(0));

        nav.focus(5, 6);
        nav.on_list_changed(ListChange::Append, 12);
        assert_eq!(nav.focused, Some(5));

        nav.on_list_changed(ListChange::FirstPage { restore: None }, 12);
        assert_eq!(nav.focused, Some(0));
    }

    #[test]
    fn test_first_page_restore_clamps_when_list_shrinks() {
        let mut nav = NavigationState::new(4);
        nav.on_list_changed(ListChange::FirstPage { restore: Some(30) }, 8);
        assert_eq!(nav.focused, Some(7));

        nav.on_list_changed(ListChange::FirstPage { restore: Some(2) }, 0);
        assert_eq!(nav.focused, None);
    }

    #[test]
    fn test_navigate_applies_moves_only() {
        let mut nav = NavigationState::new(3);
        nav.focus(3, 6);
        assert_eq!(nav.navigate(Down, 6), NavStep::EdgeBelow);
        assert_eq!(nav.focused, Some(3));
        assert_eq!(nav.navigate(Up, 6), NavStep::Moved(0));
        assert_eq!(nav.focused, Some(0));
    }
}

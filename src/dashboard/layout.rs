//! Vertical space allocation between workflow panels

pub const HEADER_HEIGHT: u16 = 3;
pub const FOOTER_HEIGHT: u16 = 1;
pub const FIXED_CHROME: u16 = HEADER_HEIGHT + FOOTER_HEIGHT;

/// Top and bottom border of every panel
pub const BORDER_ROWS: u16 = 2;

/// Borders plus the project summary line; all a collapsed panel gets
pub const WORKFLOW_CHROME: u16 = BORDER_ROWS + 1;

/// Rows of an expanded panel's allocation not used for log lines: the
/// project summary and the padding under it
const RESERVED_ROWS: u16 = 2;

/// Rows given to each expanded panel: what is left after fixed and
/// per-workflow chrome, split equally. Zero when nothing is expanded.
pub fn allocate(rows: u16, workflow_count: usize, expanded_count: usize) -> u16 {
    if expanded_count == 0 {
        return 0;
    }
    let chrome = (WORKFLOW_CHROME as usize).saturating_mul(workflow_count);
    let available = (rows as usize)
        .saturating_sub(FIXED_CHROME as usize)
        .saturating_sub(chrome);
    (available / expanded_count) as u16
}

/// Log lines shown inside an expanded panel with this allocation
pub fn visible_log_lines(allocated: u16) -> usize {
    allocated.saturating_sub(RESERVED_ROWS).max(1) as usize
}

/// An expanded panel's interior is exactly its allocation (summary,
/// padding, log lines). Never shorter than a collapsed one.
pub fn panel_height(expanded: bool, allocated: u16) -> u16 {
    if expanded {
        (BORDER_ROWS + allocated).max(WORKFLOW_CHROME)
    } else {
        WORKFLOW_CHROME
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nothing_expanded_gets_nothing() {
        assert_eq!(allocate(50, 4, 0), 0);
    }

    #[test]
    fn test_space_is_split_equally() {
        // 40 rows - 4 fixed - 4*3 chrome = 24, over 2 expanded
        assert_eq!(allocate(40, 4, 2), 12);
        assert_eq!(allocate(40, 4, 3), 8);
    }

    #[test]
    fn test_tiny_terminal_allocates_zero() {
        assert_eq!(allocate(10, 4, 4), 0);
        assert_eq!(visible_log_lines(0), 1);
    }

    #[test]
    fn test_allocation_never_exceeds_bound() {
        for rows in 0..=200u16 {
            for workflows in 1..=4usize {
                for expanded in 1..=workflows {
                    let per = allocate(rows, workflows, expanded);
                    let bound = rows.saturating_sub(FIXED_CHROME) as usize / expanded;
                    assert!(per as usize <= bound, "rows={rows} w={workflows} e={expanded}");

                    // Panels fit whenever the chrome itself fits
                    let chrome = FIXED_CHROME as usize + WORKFLOW_CHROME as usize * workflows;
                    if rows as usize >= chrome {
                        let total = chrome + per as usize * expanded;
                        assert!(total <= rows as usize);
                    }
                }
            }
        }
    }

    #[test]
    fn test_visible_lines_reserve_summary_rows() {
        assert_eq!(visible_log_lines(12), 10);
        assert_eq!(visible_log_lines(2), 1);
    }

    #[test]
    fn test_panel_height() {
        assert_eq!(panel_height(false, 12), WORKFLOW_CHROME);
        assert_eq!(panel_height(true, 12), 14);
        assert_eq!(panel_height(true, 0), WORKFLOW_CHROME);
    }

    #[test]
    fn test_expanded_interior_has_no_spare_row() {
        for allocated in 2..=40u16 {
            let interior = panel_height(true, allocated) - BORDER_ROWS;
            // summary + padding + log lines
            assert_eq!(interior as usize, RESERVED_ROWS as usize + visible_log_lines(allocated));
        }
    }
}

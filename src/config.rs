//! Import settings.

/// Grid used to place imported tables on the canvas: left to right, wrapping
/// to a new row once `x` passes `wrap_after_x`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutGrid {
    pub origin_x: i64,
    pub origin_y: i64,
    pub step_x: i64,
    pub step_y: i64,
    pub wrap_after_x: i64,
}

impl Default for LayoutGrid {
    fn default() -> Self {
        Self {
            origin_x: 100,
            origin_y: 100,
            step_x: 250,
            step_y: 200,
            wrap_after_x: 1000,
        }
    }
}

impl LayoutGrid {
    /// Positions for `count` tables, in order.
    pub fn positions(&self, count: usize) -> Vec<(i64, i64)> {
        let mut out = Vec::with_capacity(count);
        let (mut x, mut y) = (self.origin_x, self.origin_y);
        for _ in 0..count {
            out.push((x, y));
            x += self.step_x;
            if x > self.wrap_after_x {
                x = self.origin_x;
                y += self.step_y;
            }
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportOptions {
    pub grid: LayoutGrid,
    /// Prefix for synthesized column identifiers (`col_<name>`).
    pub column_id_prefix: String,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            grid: LayoutGrid::default(),
            column_id_prefix: "col_".to_string(),
        }
    }
}

impl ImportOptions {
    pub fn column_id(&self, column_name: &str) -> String {
        format!("{}{}", self.column_id_prefix, column_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_wraps_after_four_tables() {
        let positions = LayoutGrid::default().positions(6);
        assert_eq!(
            positions,
            vec![(100, 100), (350, 100), (600, 100), (850, 100), (100, 300), (350, 300)]
        );
    }

    #[test]
    fn test_column_id() {
        assert_eq!(ImportOptions::default().column_id("user_id"), "col_user_id");
    }
}

//! Stage stencils
//!
//! Each stencil is a boolean bitmap ('1' = block) that the field generator
//! upscales and centres on the column grid. Stages cycle through them in
//! order, each with its own base hue.

/// A boolean shape, one string per row
#[derive(Debug, Clone, Copy)]
pub struct Stencil {
    pub name: &'static str,
    pub rows: &'static [&'static str],
    /// Base hue (degrees) for this stage's blocks
    pub hue: f32,
}

impl Stencil {
    pub fn width(&self) -> usize {
        self.rows.iter().map(|r| r.len()).max().unwrap_or(0)
    }

    /// Set cells as (row, col), row-major
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.rows.iter().enumerate().flat_map(|(r, line)| {
            line.bytes()
                .enumerate()
                .filter(|&(_, b)| b == b'1')
                .map(move |(c, _)| (r, c))
        })
    }

    pub fn count(&self) -> usize {
        self.cells().count()
    }
}

pub const HEART: Stencil = Stencil {
    name: "heart",
    rows: &[
        "00010001000",
        "00111011100",
        "01111111110",
        "01111111110",
        "00111111100",
        "00011111000",
        "00001110000",
        "00000100000",
        "00000000000",
    ],
    hue: 0.0,
};

pub const CLOVER: Stencil = Stencil {
    name: "clover",
    rows: &[
        "00000100000",
        "00001110000",
        "00000100000",
        "00101110100",
        "01111111110",
        "00101110100",
        "00000100000",
        "00001110000",
        "00011111000",
    ],
    hue: 280.0,
};

pub const DIAMOND: Stencil = Stencil {
    name: "diamond",
    rows: &[
        "00000100000",
        "00001110000",
        "00011111000",
        "00111111100",
        "01111111110",
        "00111111100",
        "00011111000",
        "00001110000",
        "00000100000",
    ],
    hue: 55.0,
};

pub const SPADE: Stencil = Stencil {
    name: "spade",
    rows: &[
        "00000100000",
        "00001110000",
        "00011111000",
        "00111111100",
        "01111111110",
        "00011111000",
        "00000100000",
        "00001110000",
        "00011111000",
    ],
    hue: 100.0,
};

/// Stage rotation order
pub const STENCILS: [Stencil; 4] = [HEART, CLOVER, DIAMOND, SPADE];

/// Stencil for a 1-based stage index
pub fn stencil_for_stage(stage_index: u32) -> &'static Stencil {
    let i = stage_index.saturating_sub(1) as usize % STENCILS.len();
    &STENCILS[i]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_robin() {
        assert_eq!(stencil_for_stage(1).name, "heart");
        assert_eq!(stencil_for_stage(2).name, "clover");
        assert_eq!(stencil_for_stage(4).name, "spade");
        assert_eq!(stencil_for_stage(5).name, "heart");
        // Stage 0 never happens but must not panic
        assert_eq!(stencil_for_stage(0).name, "heart");
    }

    #[test]
    fn test_stencils_are_rectangular() {
        for s in &STENCILS {
            assert!(s.rows.iter().all(|r| r.len() == s.width()), "{}", s.name);
            assert_eq!(s.rows.len(), 9);
        }
    }

    #[test]
    fn test_heart_cells() {
        let top: Vec<usize> = HEART.cells().filter(|&(r, _)| r == 0).map(|(_, c)| c).collect();
        assert_eq!(top, vec![3, 7]);
        assert_eq!(HEART.cells().count(), HEART.count());
        // Bottom row of the heart is empty
        assert!(HEART.cells().all(|(r, _)| r < 8));
    }
}

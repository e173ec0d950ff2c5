//! Stereo UV splitting
//!
//! The source video is frame-packed top/bottom: one decoded frame carries
//! both eye images. Each eye plane samples only its half of the frame by
//! squashing the v coordinate into `[0, 0.5]` (right eye) or `[0.5, 1]`
//! (left eye). Plane v runs bottom-up, so the packed halves are read with
//! a [`RowMapping`] that puts the left eye on the lower rows of the frame
//! and the right eye on the upper rows.

/// Which eye a surface or camera belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Eye {
    Left,
    Right,
}

impl Eye {
    pub const BOTH: [Eye; 2] = [Eye::Left, Eye::Right];

    pub fn is_right(self) -> bool {
        matches!(self, Eye::Right)
    }

    /// v offset added after halving
    pub fn v_offset(self) -> f32 {
        match self {
            Eye::Left => 0.5,
            Eye::Right => 0.0,
        }
    }
}

/// Returns a copy of an interleaved `(u, v)` buffer remapped to one eye's half
/// of a top/bottom packed frame.
///
/// Only odd indices (v) change: `v' = v / 2 + offset`. A trailing element of
/// an odd-length buffer sits at an even index and is copied as-is.
///
/// The transform halves on every application, so geometry must be built from
/// the untouched plane UVs exactly once.
pub fn split_uvs(uvs: &[f32], eye: Eye) -> Vec<f32> {
    let offset = eye.v_offset();
    uvs.iter()
        .enumerate()
        .map(|(i, &value)| if i % 2 == 1 { value / 2.0 + offset } else { value })
        .collect()
}

/// Same as [`split_uvs`], taking the "is right eye" flag directly
pub fn split_uvs_flag(uvs: &[f32], is_right: bool) -> Vec<f32> {
    split_uvs(uvs, if is_right { Eye::Right } else { Eye::Left })
}

/// Maps a plane v coordinate (bottom-up) to a row fraction (top-down) of an
/// uploaded image: `row = offset + scale * v`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowMapping {
    pub scale: f32,
    pub offset: f32,
}

impl RowMapping {
    /// Whole image drawn upright
    pub const UPRIGHT: Self = Self { scale: -1.0, offset: 1.0 };

    /// One eye of a top/bottom packed frame, right-eye content on top.
    /// The split v range `[0.5, 1]` lands on the lower rows and `[0, 0.5]` on
    /// the upper rows, each half drawn upright.
    pub fn packed(eye: Eye) -> Self {
        let offset = match eye {
            Eye::Left => 1.5,
            Eye::Right => 0.5,
        };
        Self { scale: -1.0, offset }
    }

    pub fn row(self, v: f32) -> f32 {
        self.offset + self.scale * v
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Unit plane UVs in vertex order: top-left, top-right, bottom-left, bottom-right
    const PLANE_UVS: [f32; 8] = [0.0, 1.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0];

    #[test]
    fn left_eye_example() {
        assert_eq!(split_uvs_flag(&[0.0, 1.0, 0.0, 0.0], false), vec![0.0, 1.0, 0.0, 0.5]);
    }

    #[test]
    fn right_eye_example() {
        assert_eq!(split_uvs_flag(&[0.0, 1.0, 0.0, 1.0], true), vec![0.0, 0.5, 0.0, 0.5]);
    }

    #[test]
    fn v_ranges_per_eye() {
        let samples: Vec<f32> = (0..=20)
            .flat_map(|i| {
                let t = i as f32 / 20.0;
                [1.0 - t, t]
            })
            .collect();

        let right = split_uvs(&samples, Eye::Right);
        let left = split_uvs(&samples, Eye::Left);

        for (i, (r, l)) in right.iter().zip(&left).enumerate() {
            if i % 2 == 1 {
                assert!((0.0..=0.5).contains(r), "right v {} out of range", r);
                assert!((0.5..=1.0).contains(l), "left v {} out of range", l);
            } else {
                assert_eq!(*r, samples[i]);
                assert_eq!(*l, samples[i]);
            }
        }
    }

    #[test]
    fn plane_uvs_cover_opposite_halves() {
        let left = split_uvs(&PLANE_UVS, Eye::Left);
        let right = split_uvs(&PLANE_UVS, Eye::Right);
        assert_eq!(left, vec![0.0, 1.0, 1.0, 1.0, 0.0, 0.5, 1.0, 0.5]);
        assert_eq!(right, vec![0.0, 0.5, 1.0, 0.5, 0.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn applying_twice_is_not_idempotent() {
        let once = split_uvs(&PLANE_UVS, Eye::Right);
        let twice = split_uvs(&once, Eye::Right);
        assert_ne!(once, twice);
        assert_eq!(twice[1], 0.25);
    }

    #[test]
    fn input_is_left_untouched() {
        let input = PLANE_UVS;
        let _ = split_uvs(&input, Eye::Left);
        assert_eq!(input, PLANE_UVS);
    }

    #[test]
    fn odd_length_keeps_trailing_element() {
        assert_eq!(split_uvs(&[0.25, 0.5, 0.75], Eye::Left), vec![0.25, 0.75, 0.75]);
        assert!(split_uvs(&[], Eye::Right).is_empty());
    }

    fn rows(eye: Eye, height: f32) -> Vec<f32> {
        let mapping = RowMapping::packed(eye);
        split_uvs(&PLANE_UVS, eye).iter().skip(1).step_by(2).map(|&v| mapping.row(v) * height).collect()
    }

    #[test]
    fn left_eye_reads_lower_rows() {
        // top-left, top-right, bottom-left, bottom-right
        assert_eq!(rows(Eye::Left, 720.0), vec![360.0, 360.0, 720.0, 720.0]);
    }

    #[test]
    fn right_eye_reads_upper_rows() {
        assert_eq!(rows(Eye::Right, 720.0), vec![0.0, 0.0, 360.0, 360.0]);
    }

    #[test]
    fn upright_flips_plane_v() {
        assert_eq!(RowMapping::UPRIGHT.row(1.0), 0.0);
        assert_eq!(RowMapping::UPRIGHT.row(0.0), 1.0);
    }
}

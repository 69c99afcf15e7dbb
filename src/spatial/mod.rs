/// Number of equal-width cases the stage is divided into.
pub const MAX_CASES: f64 = 20.0;
/// Half of the rendered sprite width (32px frame at 2x scale).
pub const SPRITE_HALF_WIDTH: f64 = 32.0;

/// Pixel interval around a landmark's centre, used for containment and crossing tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Zone {
    pub start: f64,
    pub end: f64,
}

impl Zone {
    pub fn around(center: f64, radius: f64) -> Self {
        Self {
            start: center - radius,
            end: center + radius,
        }
    }

    pub fn contains(&self, pixel: f64) -> bool {
        pixel >= self.start && pixel <= self.end
    }

    /// Edge trigger: outside on the previous sample, inside on this one.
    pub fn entered(&self, prev: f64, curr: f64) -> bool {
        !self.contains(prev) && self.contains(curr)
    }
}

/// Converts between logical case positions and pixel coordinates.
///
/// A case position `c` maps to the pixel at the centre of case `c`
/// (`c * w - w / 2`). The rendered sprite is offset left of that anchor by
/// [`SPRITE_HALF_WIDTH`] so it sits centred on it.
///
/// Resizing only changes the case width. Stored case positions are not
/// remapped, so the agent's pixel position drifts proportionally with the
/// viewport.
#[derive(Debug, Clone)]
pub struct SpatialModel {
    max_cases: f64,
    case_width: f64,
}

impl SpatialModel {
    pub fn new(viewport_width: f64) -> Self {
        let mut model = Self {
            max_cases: MAX_CASES,
            case_width: 0.0,
        };
        model.resize(viewport_width);
        model
    }

    pub fn resize(&mut self, viewport_width: f64) {
        self.case_width = viewport_width / self.max_cases;
    }

    pub fn max_cases(&self) -> f64 {
        self.max_cases
    }

    pub fn case_width(&self) -> f64 {
        self.case_width
    }

    /// Anchor pixel of a case position.
    pub fn case_to_pixel(&self, case: f64) -> f64 {
        case * self.case_width - self.case_width / 2.0
    }

    pub fn pixel_to_case(&self, pixel: f64) -> f64 {
        (pixel + self.case_width / 2.0) / self.case_width
    }

    /// Left edge of the rendered sprite, never negative.
    pub fn sprite_left(&self, case: f64) -> f64 {
        (self.case_to_pixel(case) - SPRITE_HALF_WIDTH).max(0.0)
    }

    pub fn clamp_case(&self, case: f64) -> f64 {
        case.clamp(0.0, self.max_cases)
    }

    pub fn is_within_zone(&self, pixel: f64, zone: &Zone) -> bool {
        zone.contains(pixel)
    }

    pub fn crossed_zone(&self, prev_pixel: f64, curr_pixel: f64, zone: &Zone) -> bool {
        zone.entered(prev_pixel, curr_pixel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_pixel_round_trip() {
        for width in [320.0, 1000.0, 1366.0, 2560.0] {
            let model = SpatialModel::new(width);
            let mut case = 0.0;
            while case <= MAX_CASES {
                let back = model.pixel_to_case(model.case_to_pixel(case));
                assert!((back - case).abs() < 1e-9, "width {width} case {case} -> {back}");
                case += 0.25;
            }
        }
    }

    #[test]
    fn sprite_is_centred_on_case_and_clamped() {
        let model = SpatialModel::new(1000.0);
        assert_eq!(model.case_width(), 50.0);
        assert_eq!(model.case_to_pixel(10.0), 475.0);
        assert_eq!(model.sprite_left(10.0), 443.0);
        assert_eq!(model.sprite_left(0.0), 0.0);
    }

    #[test]
    fn resize_keeps_case_and_moves_pixels() {
        let mut model = SpatialModel::new(1000.0);
        let before = model.case_to_pixel(8.0);
        model.resize(2000.0);
        let after = model.case_to_pixel(8.0);
        assert_eq!(before, 375.0);
        assert_eq!(after, 750.0);
    }

    #[test]
    fn zone_edges_are_inclusive() {
        let model = SpatialModel::new(1000.0);
        let bed = Zone::around(700.0, 64.0);
        assert!(model.is_within_zone(636.0, &bed));
        assert!(model.is_within_zone(764.0, &bed));
        assert!(!model.is_within_zone(635.9, &bed));
        assert!(!model.is_within_zone(764.1, &bed));
    }

    #[test]
    fn crossing_is_edge_triggered() {
        let model = SpatialModel::new(1000.0);
        let toy = Zone::around(300.0, 32.0);
        let path = [200.0, 250.0, 270.0, 290.0, 310.0, 330.0, 340.0, 360.0];

        let crossings = path
            .windows(2)
            .filter(|w| model.crossed_zone(w[0], w[1], &toy))
            .count();
        assert_eq!(crossings, 1);

        // Leaving and coming back re-arms the trigger.
        let back_and_forth = [250.0, 290.0, 340.0, 300.0];
        let crossings = back_and_forth
            .windows(2)
            .filter(|w| model.crossed_zone(w[0], w[1], &toy))
            .count();
        assert_eq!(crossings, 2);
    }

    #[test]
    fn path_inside_zone_never_triggers() {
        let model = SpatialModel::new(1000.0);
        let bed = Zone::around(700.0, 64.0);
        let inside = [650.0, 680.0, 700.0, 730.0, 760.0];
        assert!(inside
            .windows(2)
            .all(|w| !model.crossed_zone(w[0], w[1], &bed)));
    }
}

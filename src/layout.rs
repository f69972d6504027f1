use macroquad::prelude::Rect;

pub const HEADER_HEIGHT: f32 = 5.0;
pub const SLIDER_COUNT: usize = 10;

/// Carving pieces off a rectangle. Amounts are floored to whole pixels and
/// clamped to what is left, so the pieces always tile the original.
pub trait RectSplit {
    fn remove_from_top(&mut self, amount: f32) -> Rect;
    fn remove_from_left(&mut self, amount: f32) -> Rect;
    fn remove_from_right(&mut self, amount: f32) -> Rect;
}

impl RectSplit for Rect {
    fn remove_from_top(&mut self, amount: f32) -> Rect {
        let amount = amount.floor().clamp(0.0, self.h);
        let taken = Rect::new(self.x, self.y, self.w, amount);
        self.y += amount;
        self.h -= amount;
        taken
    }

    fn remove_from_left(&mut self, amount: f32) -> Rect {
        let amount = amount.floor().clamp(0.0, self.w);
        let taken = Rect::new(self.x, self.y, amount, self.h);
        self.x += amount;
        self.w -= amount;
        taken
    }

    fn remove_from_right(&mut self, amount: f32) -> Rect {
        let amount = amount.floor().clamp(0.0, self.w);
        self.w -= amount;
        Rect::new(self.x + self.w, self.y, amount, self.h)
    }
}

/// Splits a column into `N` stacked rows of (nearly) equal height.
fn stack_rows<const N: usize>(mut column: Rect) -> [Rect; N] {
    let mut rows = [Rect::new(0.0, 0.0, 0.0, 0.0); N];
    for (index, row) in rows.iter_mut().enumerate() {
        let remaining = N - index;
        *row = if remaining == 1 {
            column
        } else {
            column.remove_from_top(column.h / remaining as f32)
        };
    }
    rows
}

/// Regions for the ten sliders, in editor order: grain density, duration and
/// playback speed down the left; global attack, decay, sustain and release
/// down the middle; grain attack, decay and sustain down the right.
pub fn slider_regions(client: Rect) -> [Rect; SLIDER_COUNT] {
    let mut bounds = client;
    bounds.remove_from_top(HEADER_HEIGHT);

    let grain_area = bounds.remove_from_left(bounds.w * 0.33);
    let grain_envelope_area = bounds.remove_from_right(bounds.w * 0.5);

    let grain: [Rect; 3] = stack_rows(grain_area);
    let grain_envelope: [Rect; 3] = stack_rows(grain_envelope_area);
    let global_envelope: [Rect; 4] = stack_rows(bounds);

    [
        grain[0],
        grain[1],
        grain[2],
        grain_envelope[0],
        grain_envelope[1],
        grain_envelope[2],
        global_envelope[0],
        global_envelope[1],
        global_envelope[2],
        global_envelope[3],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn area(rect: &Rect) -> f32 {
        rect.w * rect.h
    }

    fn intersection_area(a: &Rect, b: &Rect) -> f32 {
        let w = (a.x + a.w).min(b.x + b.w) - a.x.max(b.x);
        let h = (a.y + a.h).min(b.y + b.h) - a.y.max(b.y);
        w.max(0.0) * h.max(0.0)
    }

    fn check_tiling(client: Rect) {
        let regions = slider_regions(client);
        for (i, a) in regions.iter().enumerate() {
            assert!(a.w > 0.0 && a.h > 0.0, "region {i} is empty: {a:?}");
            for b in regions.iter().skip(i + 1) {
                assert_eq!(intersection_area(a, b), 0.0, "{a:?} overlaps {b:?}");
            }
            assert!(a.x >= client.x && a.x + a.w <= client.x + client.w);
            assert!(a.y >= client.y + HEADER_HEIGHT && a.y + a.h <= client.y + client.h);
        }
        let covered: f32 = regions.iter().map(area).sum();
        assert_eq!(covered, client.w * (client.h - HEADER_HEIGHT));
    }

    #[test]
    fn default_window_is_tiled_without_overlap() {
        check_tiling(Rect::new(0.0, 0.0, 800.0, 500.0));
    }

    #[test]
    fn odd_sizes_are_tiled_without_overlap() {
        check_tiling(Rect::new(0.0, 0.0, 1013.0, 377.0));
        check_tiling(Rect::new(20.0, 40.0, 641.0, 299.0));
    }

    #[test]
    fn columns_follow_the_editor_order() {
        let regions = slider_regions(Rect::new(0.0, 0.0, 800.0, 500.0));
        // Left column is a third of the width.
        assert_eq!(regions[0], Rect::new(0.0, 5.0, 264.0, 165.0));
        assert_eq!(regions[1].y, 170.0);
        assert_eq!(regions[2].y + regions[2].h, 500.0);
        // Grain envelope takes the right half of what is left.
        assert_eq!(regions[3].x, 532.0);
        assert_eq!(regions[3].w, 268.0);
        // Global envelope fills the middle in four rows.
        assert_eq!(regions[6].x, 264.0);
        assert_eq!(regions[6].w, 268.0);
        assert_eq!(regions[6].h, 123.0);
        assert_eq!(regions[9].y + regions[9].h, 500.0);
    }

    #[test]
    fn splitting_never_goes_negative() {
        let mut rect = Rect::new(0.0, 0.0, 10.0, 10.0);
        let taken = rect.remove_from_top(25.0);
        assert_eq!(taken.h, 10.0);
        assert_eq!(rect.h, 0.0);
        let taken = rect.remove_from_right(4.6);
        assert_eq!(taken, Rect::new(6.0, 10.0, 4.0, 0.0));
        assert_eq!(rect.w, 6.0);
    }
}

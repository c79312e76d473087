//! Synthetic scene and frame timing for simulated sessions

use bubble_app::HeadlessContext;
use bubble_core::Color;
use bubble_render::RenderObject;

const PALETTE: [Color; 3] = [Color::RED, Color::GREEN, Color::BLUE];
const BUBBLE_SIZE: f32 = 40.0;

/// Bubbles rising through an 800x600 base canvas, wrapping at the top
pub fn bubbles(ctx: &HeadlessContext, count: usize) -> Vec<RenderObject> {
    let columns = 12;
    (0..count)
        .map(|i| {
            let column = (i % columns) as f32;
            let row = (i / columns) as f32;
            let rise = (ctx.frame_index as f32 * 2.0 + row * 90.0) % 700.0;
            RenderObject::bubble(
                format!("bubble-{i}"),
                40.0 + column * 65.0,
                650.0 - rise,
                BUBBLE_SIZE,
                PALETTE[i % PALETTE.len()].faded(1.0 - rise / 1400.0),
            )
        })
        .collect()
}

/// Frame durations: `normal_ms` until `slow_after`, then `slow_ms`
#[derive(Clone, Copy, Debug)]
pub struct FramePacing {
    pub normal_ms: u64,
    pub slow_ms: u64,
    pub slow_after: Option<u32>,
}

impl FramePacing {
    pub fn frame_ms(&self, ctx: &HeadlessContext) -> u64 {
        match self.slow_after {
            Some(after) if ctx.frame_index >= after => self.slow_ms,
            _ => self.normal_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(frame_index: u32) -> HeadlessContext {
        HeadlessContext {
            frame_index,
            width: 800,
            height: 600,
            elapsed_ms: 0,
        }
    }

    #[test]
    fn test_bubbles_are_unique_and_on_canvas() {
        let scene = bubbles(&ctx(7), 30);
        assert_eq!(scene.len(), 30);
        let mut ids: Vec<&str> = scene.iter().map(|b| b.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 30);
        assert!(scene.iter().all(|b| b.x > 0.0 && b.x < 800.0));
        assert!(scene.iter().all(|b| b.color.a > 0.5 && b.color.a <= 1.0));
    }

    #[test]
    fn test_pacing_slows_after_threshold() {
        let pacing = FramePacing {
            normal_ms: 16,
            slow_ms: 40,
            slow_after: Some(10),
        };
        assert_eq!(pacing.frame_ms(&ctx(9)), 16);
        assert_eq!(pacing.frame_ms(&ctx(10)), 40);

        let steady = FramePacing {
            slow_after: None,
            ..pacing
        };
        assert_eq!(steady.frame_ms(&ctx(1_000)), 16);
    }
}

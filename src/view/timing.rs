use crate::view::DrawingMode;

/// Fixed-capacity ring of frame durations in milliseconds. Once full, each
/// push overwrites the oldest sample.
#[derive(Clone, Debug)]
pub struct DurationRing {
    samples: Vec<f64>,
    next: usize,
    len: usize,
}

impl DurationRing {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: vec![0.0; capacity.max(1)],
            next: 0,
            len: 0,
        }
    }

    pub fn push(&mut self, duration_ms: f64) {
        self.samples[self.next] = duration_ms;
        self.next = (self.next + 1) % self.samples.len();
        self.len = (self.len + 1).min(self.samples.len());
    }

    /// Mean of the stored samples, `None` when empty.
    pub fn average(&self) -> Option<f64> {
        if self.len == 0 {
            return None;
        }
        let sum: f64 = if self.len == self.samples.len() {
            self.samples.iter().sum()
        } else {
            self.samples[..self.len].iter().sum()
        };
        Some(sum / self.len as f64)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.samples.len()
    }

    pub fn clear(&mut self) {
        self.next = 0;
        self.len = 0;
    }
}

/// Tracks the last frame timestamp to compute delta and fps.
#[derive(Clone, Debug, Default)]
pub struct FrameTiming {
    last_timestamp: Option<f64>,
}

impl FrameTiming {
    /// Returns `(delta, fps)` for a frame at `timestamp`.
    ///
    /// Untimed frames and the first timed frame have a delta of 0. fps is
    /// only defined when delta is positive.
    pub fn advance(&mut self, timestamp: Option<f64>) -> (f64, Option<f64>) {
        let Some(ts) = timestamp else {
            return (0.0, None);
        };

        let delta = self.last_timestamp.map_or(0.0, |last| ts - last);
        self.last_timestamp = Some(ts);

        let fps = (delta > 0.0).then(|| 1.0 / delta);
        (delta, fps)
    }

    pub fn reset(&mut self) {
        self.last_timestamp = None;
    }

    pub fn last_timestamp(&self) -> Option<f64> {
        self.last_timestamp
    }
}

/// Debug overlay text, e.g. `"4ms 60fps/continuous"` or `"3ms/default"`.
pub fn overlay_text(average_ms: f64, fps: Option<f64>, mode: DrawingMode) -> String {
    let mut text = format!("{}ms", average_ms.round() as i64);
    if mode == DrawingMode::Continuous {
        if let Some(fps) = fps {
            text.push_str(&format!(" {}fps", fps.round() as i64));
        }
    }
    text.push('/');
    text.push_str(match mode {
        DrawingMode::Continuous => "continuous",
        DrawingMode::OnDemand => "default",
    });
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_overwrites_oldest() {
        let mut ring = DurationRing::new(3);
        assert_eq!(ring.average(), None);

        ring.push(1.0);
        ring.push(2.0);
        assert_eq!(ring.average(), Some(1.5));

        ring.push(3.0);
        ring.push(9.0);
        assert_eq!(ring.len(), 3);
        assert_eq!(ring.average(), Some((2.0 + 3.0 + 9.0) / 3.0));
    }

    #[test]
    fn first_frame_has_no_fps() {
        let mut timing = FrameTiming::default();
        assert_eq!(timing.advance(Some(1.0)), (0.0, None));
        assert_eq!(timing.advance(Some(1.5)), (0.5, Some(2.0)));
        assert_eq!(timing.advance(Some(1.5)), (0.0, None));
    }

    #[test]
    fn untimed_frames_do_not_move_the_clock() {
        let mut timing = FrameTiming::default();
        timing.advance(Some(2.0));
        assert_eq!(timing.advance(None), (0.0, None));
        assert_eq!(timing.last_timestamp(), Some(2.0));

        timing.reset();
        assert_eq!(timing.advance(Some(3.0)), (0.0, None));
    }

    #[test]
    fn overlay_mentions_fps_only_when_continuous() {
        assert_eq!(
            overlay_text(4.4, Some(59.9), DrawingMode::Continuous),
            "4ms 60fps/continuous"
        );
        assert_eq!(overlay_text(4.4, None, DrawingMode::Continuous), "4ms/continuous");
        assert_eq!(overlay_text(3.0, Some(60.0), DrawingMode::OnDemand), "3ms/default");
    }
}

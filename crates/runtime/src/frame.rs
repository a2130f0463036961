/// Metadata for one iteration of the render loop.
///
/// Timestamps come from the host (an animation-frame callback or a timer), in
/// milliseconds, so the loop can be replayed with synthetic clocks.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Frame {
    /// 0-based frame index.
    pub index: u64,
    /// Host timestamp at the start of the frame (milliseconds).
    pub now_ms: f64,
    /// Time since the previous frame; `None` for the first frame.
    pub dt_ms: Option<f64>,
}

impl Frame {
    /// Instantaneous frames-per-second, if a previous frame exists.
    pub fn fps(&self) -> Option<f64> {
        match self.dt_ms {
            Some(dt) if dt > 0.0 => Some(1000.0 / dt),
            Some(_) => Some(f64::INFINITY),
            None => None,
        }
    }
}

/// Turns host timestamps into a sequence of [`Frame`]s.
#[derive(Debug, Default, Clone)]
pub struct FrameClock {
    next_index: u64,
    last_ms: Option<f64>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tick(&mut self, now_ms: f64) -> Frame {
        let frame = Frame {
            index: self.next_index,
            now_ms,
            dt_ms: self.last_ms.map(|last| (now_ms - last).max(0.0)),
        };
        self.next_index = self.next_index.wrapping_add(1);
        self.last_ms = Some(now_ms);
        frame
    }

    pub fn frames_elapsed(&self) -> u64 {
        self.next_index
    }
}

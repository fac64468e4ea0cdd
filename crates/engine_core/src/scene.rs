use gaze_select::PickTarget;

/// World driven by the frame engine
pub trait Scene {
    /// Move the simulation forward by `dt_ms`
    fn advance(&mut self, dt_ms: f64);

    /// Selectable bodies at their current positions, in picking order
    fn pick_targets(&self) -> Vec<PickTarget>;
}

/// Scene whose bodies never move
#[derive(Debug, Clone, Default)]
pub struct StaticScene {
    pub targets: Vec<PickTarget>,
    pub elapsed_ms: f64,
}

impl StaticScene {
    pub fn new(targets: Vec<PickTarget>) -> Self {
        Self {
            targets,
            elapsed_ms: 0.0,
        }
    }
}

impl Scene for StaticScene {
    fn advance(&mut self, dt_ms: f64) {
        self.elapsed_ms += dt_ms;
    }

    fn pick_targets(&self) -> Vec<PickTarget> {
        self.targets.clone()
    }
}

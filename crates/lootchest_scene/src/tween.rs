use glam::Vec3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Ease {
    Linear,
    #[default]
    Power2InOut,
}

impl Ease {
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Ease::Linear => t,
            Ease::Power2InOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TweenLeg {
    pub to: Vec3,
    pub duration: f32,
    pub ease: Ease,
}

impl TweenLeg {
    pub fn new(to: Vec3, duration: f32) -> Self {
        Self {
            to,
            duration,
            ease: Ease::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimelineEvent {
    LegCompleted(usize),
    Completed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TimelineState {
    Running,
    Completed,
    Killed,
}

/// Sequence of position tweens played back to back. Each leg starts from
/// wherever the previous one ended.
#[derive(Clone, Debug)]
pub struct Timeline {
    legs: Vec<TweenLeg>,
    leg: usize,
    leg_from: Vec3,
    leg_elapsed: f32,
    value: Vec3,
    state: TimelineState,
}

impl Timeline {
    pub fn new(start: Vec3, legs: Vec<TweenLeg>) -> Self {
        let state = if legs.is_empty() {
            TimelineState::Completed
        } else {
            TimelineState::Running
        };
        Self {
            legs,
            leg: 0,
            leg_from: start,
            leg_elapsed: 0.0,
            value: start,
            state,
        }
    }

    pub fn value(&self) -> Vec3 {
        self.value
    }

    pub fn is_active(&self) -> bool {
        self.state == TimelineState::Running
    }

    pub fn is_killed(&self) -> bool {
        self.state == TimelineState::Killed
    }

    pub fn total_duration(&self) -> f32 {
        self.legs.iter().map(|l| l.duration.max(0.0)).sum()
    }

    /// Drops every pending leg. A killed timeline never moves or reports again.
    pub fn kill(&mut self) {
        if self.state == TimelineState::Running {
            self.state = TimelineState::Killed;
        }
    }

    pub fn update(&mut self, dt: f32) -> Vec<TimelineEvent> {
        let mut events = Vec::new();
        if !self.is_active() {
            return events;
        }

        let mut remaining = dt.max(0.0);
        while let Some(leg) = self.legs.get(self.leg).copied() {
            self.leg_elapsed += remaining;
            if self.leg_elapsed < leg.duration {
                let t = leg.ease.apply(self.leg_elapsed / leg.duration);
                self.value = self.leg_from.lerp(leg.to, t);
                return events;
            }

            remaining = self.leg_elapsed - leg.duration.max(0.0);
            self.value = leg.to;
            self.leg_from = leg.to;
            self.leg_elapsed = 0.0;
            events.push(TimelineEvent::LegCompleted(self.leg));
            self.leg += 1;
        }

        self.state = TimelineState::Completed;
        events.push(TimelineEvent::Completed);
        events
    }
}

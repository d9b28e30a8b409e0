use glam::{Quat, Vec3};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Interpolation {
    Linear,
    Step,
}

#[derive(Clone, Debug)]
pub enum ChannelOutputs {
    Translations(Vec<Vec3>),
    Rotations(Vec<Quat>),
    Scales(Vec<Vec3>),
}

impl ChannelOutputs {
    pub fn len(&self) -> usize {
        match self {
            ChannelOutputs::Translations(v) | ChannelOutputs::Scales(v) => v.len(),
            ChannelOutputs::Rotations(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ChannelValue {
    Translation(Vec3),
    Rotation(Quat),
    Scale(Vec3),
}

/// Keyframe track animating one property of a node, addressed by node name.
#[derive(Clone, Debug)]
pub struct Channel {
    pub target: String,
    pub times: Vec<f32>,
    pub outputs: ChannelOutputs,
    pub interpolation: Interpolation,
}

impl Channel {
    pub fn new(
        target: impl Into<String>,
        times: Vec<f32>,
        outputs: ChannelOutputs,
        interpolation: Interpolation,
    ) -> Self {
        Self {
            target: target.into(),
            times,
            outputs,
            interpolation,
        }
    }

    pub fn duration(&self) -> f32 {
        self.times.last().copied().unwrap_or(0.0)
    }

    /// Value of the track at `time`, clamped to the first and last keyframes.
    pub fn sample(&self, time: f32) -> Option<ChannelValue> {
        let count = self.times.len().min(self.outputs.len());
        if count == 0 {
            return None;
        }

        let next = self.times[..count].partition_point(|&t| t <= time);
        let (a, b, factor) = if next == 0 {
            (0, 0, 0.0)
        } else if next >= count {
            (count - 1, count - 1, 0.0)
        } else {
            let a = next - 1;
            let span = self.times[next] - self.times[a];
            let factor = if span > 0.0 {
                (time - self.times[a]) / span
            } else {
                0.0
            };
            (a, next, factor)
        };
        let factor = match self.interpolation {
            Interpolation::Linear => factor,
            Interpolation::Step => 0.0,
        };

        Some(match &self.outputs {
            ChannelOutputs::Translations(v) => ChannelValue::Translation(v[a].lerp(v[b], factor)),
            ChannelOutputs::Scales(v) => ChannelValue::Scale(v[a].lerp(v[b], factor)),
            ChannelOutputs::Rotations(v) => {
                ChannelValue::Rotation(v[a].slerp(v[b], factor).normalize())
            }
        })
    }
}

#[derive(Clone, Debug)]
pub struct AnimationClip {
    pub name: String,
    pub channels: Vec<Channel>,
    pub duration: f32,
}

impl AnimationClip {
    pub fn new(name: impl Into<String>, channels: Vec<Channel>) -> Self {
        let duration = channels.iter().map(Channel::duration).fold(0.0, f32::max);
        Self {
            name: name.into(),
            channels,
            duration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lift() -> Channel {
        Channel::new(
            "lid",
            vec![0.0, 1.0, 2.0],
            ChannelOutputs::Translations(vec![Vec3::ZERO, Vec3::Y, Vec3::Y * 3.0]),
            Interpolation::Linear,
        )
    }

    #[test]
    fn linear_sampling_interpolates_between_keys() {
        let Some(ChannelValue::Translation(v)) = lift().sample(1.5) else {
            panic!("expected a translation");
        };
        assert!(v.abs_diff_eq(Vec3::Y * 2.0, 1e-6));
    }

    #[test]
    fn sampling_clamps_outside_the_track() {
        let channel = lift();
        assert_eq!(channel.sample(-1.0), Some(ChannelValue::Translation(Vec3::ZERO)));
        assert_eq!(
            channel.sample(10.0),
            Some(ChannelValue::Translation(Vec3::Y * 3.0))
        );
    }

    #[test]
    fn step_sampling_holds_previous_key() {
        let mut channel = lift();
        channel.interpolation = Interpolation::Step;
        assert_eq!(channel.sample(0.9), Some(ChannelValue::Translation(Vec3::ZERO)));
    }

    #[test]
    fn clip_duration_is_longest_channel() {
        let short = Channel::new(
            "lid",
            vec![0.0, 0.5],
            ChannelOutputs::Scales(vec![Vec3::ONE, Vec3::ONE]),
            Interpolation::Linear,
        );
        let clip = AnimationClip::new("open", vec![short, lift()]);
        assert_eq!(clip.duration, 2.0);
    }
}

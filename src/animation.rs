use glam::{Mat4, Quat, Vec3};

use crate::{external::ExternalAnimation, track::TrackStore};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trs {
    pub t: Vec3,
    pub r: Quat,
    pub s: Vec3,
}

impl Default for Trs {
    fn default() -> Self {
        Self {
            t: Vec3::ZERO,
            r: Quat::IDENTITY,
            s: Vec3::ONE,
        }
    }
}

impl Trs {
    pub fn from_mat4(matrix: &Mat4) -> Self {
        let (s, r, t) = matrix.to_scale_rotation_translation();
        Self { t, r, s }
    }

    pub fn to_mat4(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.s, self.r, self.t)
    }
}

/// Keyframes for one animated node, times in seconds.
#[derive(Debug, Clone, Default)]
pub struct NodeTracks {
    pub node_name: String,
    pub positions: TrackStore<Vec3>,
    pub rotations: TrackStore<Quat>,
    pub scales: TrackStore<Vec3>,
}

impl NodeTracks {
    /// Samples every channel at `time`. Channels without keys keep `rest`.
    pub fn sample(&self, time: f64, rest: &Trs) -> Trs {
        Trs {
            t: self.positions.sample(time).unwrap_or(rest.t),
            r: self.rotations.sample(time).unwrap_or(rest.r),
            s: self.scales.sample(time).unwrap_or(rest.s),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AnimationClip {
    pub name: String,
    /// Seconds.
    pub duration: f64,
    pub tracks: Vec<NodeTracks>,
}

impl AnimationClip {
    pub fn from_external(animation: &ExternalAnimation) -> Self {
        // a zero rate means the keys are already in seconds
        let ticks_per_second = if animation.ticks_per_second > 0.0 {
            animation.ticks_per_second
        } else {
            1.0
        };
        let seconds = |ticks: f64| ticks / ticks_per_second;

        let tracks = animation
            .channels
            .iter()
            .map(|channel| {
                let mut tracks = NodeTracks {
                    node_name: channel.node_name.clone(),
                    ..Default::default()
                };
                for &(time, value) in &channel.position_keys {
                    tracks.positions.add(seconds(time), value);
                }
                for &(time, value) in &channel.rotation_keys {
                    tracks.rotations.add(seconds(time), value);
                }
                for &(time, value) in &channel.scaling_keys {
                    tracks.scales.add(seconds(time), value);
                }
                tracks
            })
            .collect();

        Self {
            name: animation.name.clone(),
            duration: seconds(animation.duration),
            tracks,
        }
    }

    pub fn track(&self, node_name: &str) -> Option<&NodeTracks> {
        self.tracks.iter().find(|track| track.node_name == node_name)
    }
}

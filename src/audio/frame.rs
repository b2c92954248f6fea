use std::ops::{Add, AddAssign};

/// One stereo frame. Mono signals inside the graph carry the same value on
/// both channels.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StereoSample {
    pub left: f32,
    pub right: f32,
}

impl StereoSample {
    pub const fn new(left: f32, right: f32) -> Self {
        Self { left, right }
    }

    pub const fn mono(value: f32) -> Self {
        Self { left: value, right: value }
    }

    pub const fn silence() -> Self {
        Self { left: 0.0, right: 0.0 }
    }

    #[inline]
    pub fn scale(self, gain: f32) -> Self {
        Self {
            left: self.left * gain,
            right: self.right * gain,
        }
    }

    #[inline]
    pub fn downmix(self) -> f32 {
        0.5 * (self.left + self.right)
    }
}

impl Add for StereoSample {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            left: self.left + rhs.left,
            right: self.right + rhs.right,
        }
    }
}

impl AddAssign for StereoSample {
    fn add_assign(&mut self, rhs: Self) {
        self.left += rhs.left;
        self.right += rhs.right;
    }
}

/// Interleave frames for a device with `channels` outputs.
/// Mono devices get the downmix; channels past the second are zeroed.
/// Returns the number of samples written.
pub fn write_interleaved(frames: &[StereoSample], out: &mut [f32], channels: usize) -> usize {
    if channels == 0 {
        return 0;
    }
    let mut written = 0;
    for (frame, slot) in frames.iter().zip(out.chunks_exact_mut(channels)) {
        match channels {
            1 => slot[0] = frame.downmix(),
            _ => {
                slot[0] = frame.left;
                slot[1] = frame.right;
                for extra in &mut slot[2..] {
                    *extra = 0.0;
                }
            }
        }
        written += channels;
    }
    written
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interleaves_for_stereo_and_mono_devices() {
        let frames = [StereoSample::new(1.0, 0.0), StereoSample::new(0.5, 0.5)];

        let mut stereo = [9.0; 4];
        assert_eq!(write_interleaved(&frames, &mut stereo, 2), 4);
        assert_eq!(stereo, [1.0, 0.0, 0.5, 0.5]);

        let mut mono = [9.0; 2];
        assert_eq!(write_interleaved(&frames, &mut mono, 1), 2);
        assert_eq!(mono, [0.5, 0.5]);
    }

    #[test]
    fn extra_channels_are_zeroed() {
        let frames = [StereoSample::new(0.25, -0.25)];
        let mut quad = [9.0; 4];
        write_interleaved(&frames, &mut quad, 4);
        assert_eq!(quad, [0.25, -0.25, 0.0, 0.0]);
    }
}

//! Speaker-click integration into the output mix.
//!
//! The Apple II speaker is one bit toggled by $C030 accesses. Toggle
//! timestamps are recorded against the unit clock during emulation; when a
//! frame's audio is assembled, each output sample integrates the speaker
//! level over its slice of the clock window, which keeps clicks clean even
//! when software toggles faster than the sample rate.

/// Speaker contribution amplitude relative to full scale.
const AMPLITUDE: f32 = 0.25;

/// Integrate speaker transitions over a clock window into an interleaved
/// stereo buffer (added to whatever is already there). `initial_level` is
/// the speaker state when the window opened.
pub fn mix_speaker_transitions(
    transitions: &[(u64, bool)],
    initial_level: bool,
    window_start: u64,
    window_clocks: u64,
    samples: &mut [f32],
) {
    let frames = samples.len() / 2;
    if frames == 0 || window_clocks == 0 {
        return;
    }
    if transitions.is_empty() && !initial_level {
        return;
    }
    let clocks_per_frame = window_clocks as f32 / frames as f32;
    let mut index = 0;
    let mut level = initial_level;
    for (frame, chunk) in samples.chunks_exact_mut(2).enumerate() {
        let t_start = window_start as f32 + frame as f32 * clocks_per_frame;
        let t_end = t_start + clocks_per_frame;
        let mut high_time = 0.0f32;
        let mut t_pos = t_start;
        while index < transitions.len() {
            let (at, new_level) = transitions[index];
            let at = at as f32;
            if at >= t_end {
                break;
            }
            if at > t_pos {
                if level {
                    high_time += at - t_pos;
                }
                t_pos = at;
            }
            level = new_level;
            index += 1;
        }
        if level {
            high_time += t_end - t_pos;
        }
        let value = AMPLITUDE * (high_time / clocks_per_frame);
        chunk[0] += value;
        chunk[1] += value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silent_when_level_low_and_no_transitions() {
        let mut samples = vec![0.0f32; 64];
        mix_speaker_transitions(&[], false, 0, 1000, &mut samples);
        assert!(samples.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn constant_high_adds_full_amplitude() {
        let mut samples = vec![0.0f32; 8];
        mix_speaker_transitions(&[], true, 0, 1000, &mut samples);
        for &s in &samples {
            assert!((s - AMPLITUDE).abs() < 1e-5);
        }
    }

    #[test]
    fn mid_window_toggle_splits_energy() {
        let mut samples = vec![0.0f32; 4]; // 2 frames
        mix_speaker_transitions(&[(500, true)], false, 0, 1000, &mut samples);
        assert!(samples[0].abs() < 1e-5, "first frame silent");
        assert!((samples[2] - AMPLITUDE).abs() < 1e-5, "second frame high");
    }

    #[test]
    fn fast_toggling_averages_to_half() {
        let transitions: Vec<(u64, bool)> = (0..100).map(|i| (i * 10, i % 2 == 0)).collect();
        let mut samples = vec![0.0f32; 4];
        mix_speaker_transitions(&transitions, false, 0, 1000, &mut samples);
        for chunk in samples.chunks_exact(2) {
            assert!((chunk[0] - AMPLITUDE / 2.0).abs() < 0.05);
        }
    }
}

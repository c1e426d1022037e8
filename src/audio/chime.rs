use std::f32::consts::PI;
use std::time::Duration;

const SAMPLE_RATE: u32 = 44100;

/// Short bell-like alert tone
/// A sine with a quick attack and exponential decay, plus a quiet octave
/// overtone so it cuts through music on small speakers.
pub struct Chime {
    freq: f32,
    sample_rate: u32,
    num_sample: usize,
    total_samples: usize,
}

impl Chime {
    pub fn new(freq: f32, duration: Duration) -> Self {
        Self {
            freq,
            sample_rate: SAMPLE_RATE,
            num_sample: 0,
            total_samples: (duration.as_secs_f32() * SAMPLE_RATE as f32) as usize,
        }
    }

    fn envelope(&self, t: f32) -> f32 {
        // 5ms linear attack avoids a click at the start
        let attack = (t / 0.005).min(1.0);
        attack * (-6.0 * t).exp()
    }
}

impl Default for Chime {
    fn default() -> Self {
        Self::new(880.0, Duration::from_millis(700))
    }
}

impl Iterator for Chime {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        if self.num_sample >= self.total_samples {
            return None;
        }
        let t = self.num_sample as f32 / self.sample_rate as f32;
        self.num_sample += 1;

        let fundamental = (2.0 * PI * self.freq * t).sin();
        let overtone = (2.0 * PI * self.freq * 2.0 * t).sin() * 0.25;

        Some((fundamental + overtone) * self.envelope(t) * 0.5)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.total_samples.saturating_sub(self.num_sample);
        (left, Some(left))
    }
}

#[cfg(feature = "audio")]
impl rodio::Source for Chime {
    fn current_frame_len(&self) -> Option<usize> {
        Some(self.total_samples.saturating_sub(self.num_sample))
    }

    fn channels(&self) -> u16 {
        1 // Mono
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        Some(Duration::from_secs_f32(
            self.total_samples as f32 / self.sample_rate as f32,
        ))
    }
}

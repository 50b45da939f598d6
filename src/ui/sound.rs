/// Sound engine: procedural overworld sound effects via rodio.
///
///   blip   one per revealed dialog character (pitch wobbles a little)
///   chime  dialog opened
///   thud   walked into a wall
///
/// Buffers are generated as in-memory WAV at init time. Playback is
/// fire-and-forget (non-blocking) via rodio's Sink.
///
/// Compile without the "sound" feature to disable audio entirely (the
/// stub SoundEngine does nothing).

#[cfg(feature = "sound")]
mod inner {
    use std::io::Cursor;
    use std::sync::Arc;

    use rodio::{OutputStream, OutputStreamHandle, Sink};
    use tracing::warn;

    pub(super) const SAMPLE_RATE: u32 = 22050;

    /// Blip variants cycled through so typing doesn't drone on one pitch.
    const BLIP_FREQS: [f32; 4] = [620.0, 660.0, 700.0, 660.0];

    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        sfx_blips: Vec<Arc<Vec<u8>>>,
        sfx_chime: Arc<Vec<u8>>,
        sfx_thud: Arc<Vec<u8>>,
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = match OutputStream::try_default() {
                Ok(pair) => pair,
                Err(error) => {
                    warn!(%error, "audio_unavailable");
                    return None;
                }
            };

            Some(SoundEngine {
                _stream: stream,
                handle,
                sfx_blips: BLIP_FREQS
                    .iter()
                    .map(|&f| Arc::new(make_wav(&gen_blip(f, 0.025, 0.15))))
                    .collect(),
                sfx_chime: Arc::new(make_wav(&gen_chime())),
                sfx_thud: Arc::new(make_wav(&gen_thud())),
            })
        }

        fn play(&self, buf: &Arc<Vec<u8>>) {
            if let Ok(sink) = Sink::try_new(&self.handle) {
                let cursor = Cursor::new(buf.as_ref().clone());
                if let Ok(src) = rodio::Decoder::new(cursor) {
                    sink.append(src);
                    sink.detach(); // fire-and-forget
                }
            }
        }

        /// `n` = index of the revealed character, picks the variant.
        pub fn play_blip(&self, n: usize) {
            if let Some(buf) = self.sfx_blips.get(n % self.sfx_blips.len().max(1)) {
                self.play(buf);
            }
        }

        pub fn play_chime(&self) { self.play(&self.sfx_chime); }
        pub fn play_thud(&self) { self.play(&self.sfx_thud); }
    }

    // ════════════════════════════════════════════════════════════
    //  Waveform generators: all produce Vec<f32> mono samples
    // ════════════════════════════════════════════════════════════

    /// Simple sine blip at given frequency and duration
    pub(super) fn gen_blip(freq: f32, duration: f32, volume: f32) -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * duration) as usize;
        (0..n)
            .map(|i| {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32); // linear fade out
                (t * freq * 2.0 * std::f32::consts::PI).sin() * env * volume
            })
            .collect()
    }

    /// Dialog open: two soft ascending notes E5→A5
    pub(super) fn gen_chime() -> Vec<f32> {
        let pairs = [(659.0_f32, 0.07), (880.0, 0.14)];
        let mut samples = Vec::new();
        for &(freq, dur) in &pairs {
            let n = (SAMPLE_RATE as f32 * dur) as usize;
            for i in 0..n {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32).powf(0.5);
                let wave = (t * freq * 2.0 * std::f32::consts::PI).sin() * 0.7
                    + (t * freq * 2.0 * 2.0 * std::f32::consts::PI).sin() * 0.3;
                samples.push(wave * env * 0.25);
            }
        }
        samples
    }

    /// Wall bump: short low thump with a bit of noise
    pub(super) fn gen_thud() -> Vec<f32> {
        let duration = 0.08;
        let n = (SAMPLE_RATE as f32 * duration) as usize;
        let mut rng: u32 = 4242;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                let freq = 140.0 - t * 60.0; // 140Hz → 80Hz
                let ti = i as f32 / SAMPLE_RATE as f32;
                let tone = (ti * freq * 2.0 * std::f32::consts::PI).sin();
                // Simple LCG noise
                rng = rng.wrapping_mul(1103515245).wrapping_add(12345);
                let noise = (rng as f32 / u32::MAX as f32) * 2.0 - 1.0;
                let env = (1.0 - t).powf(1.5);
                (tone * 0.8 + noise * 0.2) * env * 0.35
            })
            .collect()
    }

    // ════════════════════════════════════════════════════════════
    //  WAV encoder: wraps f32 samples into a valid WAV buffer
    // ════════════════════════════════════════════════════════════

    pub(super) fn make_wav(samples: &[f32]) -> Vec<u8> {
        let num_channels: u16 = 1;
        let bits_per_sample: u16 = 16;
        let byte_rate = SAMPLE_RATE * (num_channels as u32) * (bits_per_sample as u32) / 8;
        let block_align = num_channels * bits_per_sample / 8;
        let data_size = samples.len() as u32 * 2; // 16-bit = 2 bytes per sample
        let file_size = 36 + data_size;

        let mut buf = Vec::with_capacity(44 + data_size as usize);

        // RIFF header
        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&file_size.to_le_bytes());
        buf.extend_from_slice(b"WAVE");

        // fmt chunk
        buf.extend_from_slice(b"fmt ");
        buf.extend_from_slice(&16u32.to_le_bytes()); // chunk size
        buf.extend_from_slice(&1u16.to_le_bytes());  // PCM format
        buf.extend_from_slice(&num_channels.to_le_bytes());
        buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        buf.extend_from_slice(&byte_rate.to_le_bytes());
        buf.extend_from_slice(&block_align.to_le_bytes());
        buf.extend_from_slice(&bits_per_sample.to_le_bytes());

        // data chunk
        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&data_size.to_le_bytes());

        for &s in samples {
            let val = (s.clamp(-1.0, 1.0) * 32767.0) as i16;
            buf.extend_from_slice(&val.to_le_bytes());
        }

        buf
    }
}

// ════════════════════════════════════════════════════════════
//  Public API, compiles to no-ops when sound feature is off
// ════════════════════════════════════════════════════════════

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new() -> Option<Self> { Some(SoundEngine) }
    pub fn play_blip(&self, _n: usize) {}
    pub fn play_chime(&self) {}
    pub fn play_thud(&self) {}
}

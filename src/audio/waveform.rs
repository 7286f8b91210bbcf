// RMS amplitude envelope for waveform visualization
//
// The samples are split into `samples.len() / columns` sized blocks and each
// complete block is reduced to its root-mean-square. A trailing partial block
// is dropped, never padded.

/// Gain applied by the drawing surface: line height = rms * WAVEFORM_GAIN
pub const WAVEFORM_GAIN: f32 = 200.0;

/// Number of raw samples averaged into one envelope value.
///
/// Zero when there are no more samples than columns, in which case the
/// envelope is empty.
pub fn block_size(sample_count: usize, columns: usize) -> usize {
    if columns == 0 || columns >= sample_count {
        return 0;
    }
    sample_count / columns
}

/// Compute one RMS value per complete block of `samples`, in order
pub fn rms_envelope(samples: &[f32], columns: usize) -> Vec<f32> {
    let block = block_size(samples.len(), columns);
    if block == 0 {
        return Vec::new();
    }

    samples
        .chunks_exact(block)
        .map(|chunk| {
            let sum: f64 = chunk.iter().map(|&s| (s as f64) * (s as f64)).sum();
            (sum / block as f64).sqrt() as f32
        })
        .collect()
}

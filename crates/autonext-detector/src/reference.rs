use autonext_hash::Fingerprint;

/// Fingerprint of an idealized letterboxed credits frame: a zero border a
/// quarter of the grid wide, with two filled text bands hugging the top and
/// bottom of the interior.
pub(crate) fn reference_pattern(rows: u32, cols: u32) -> Fingerprint {
    let margin_rows = rows / 4;
    let margin_cols = cols / 4;
    let band_height = (rows - 2 * margin_rows) / 4;

    let mut pattern = Fingerprint::zeroed(rows, cols);
    let top_band = margin_rows..margin_rows + band_height;
    let bottom_band = rows - margin_rows - band_height..rows - margin_rows;
    for row in top_band.chain(bottom_band) {
        for col in margin_cols..cols - margin_cols {
            pattern.set_bit((row * cols + col) as usize);
        }
    }
    pattern
}

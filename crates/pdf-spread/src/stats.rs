use crate::options::SpreadOptions;
use crate::types::*;

/// Predict the output of running `options` over `source_pages` pages.
///
/// Only the page count matters here; no file is read.
pub fn calculate_statistics(
    source_pages: usize,
    options: &SpreadOptions,
) -> Result<SpreadStatistics> {
    options.validate()?;

    if source_pages == 0 {
        return Err(SpreadError::NoPages);
    }

    let (output_pages, spreads, unpaired_pages) = if options.combine.is_some() {
        (source_pages.div_ceil(2), source_pages / 2, source_pages % 2)
    } else {
        (source_pages, 0, 0)
    };

    Ok(SpreadStatistics {
        source_pages,
        output_pages,
        spreads,
        unpaired_pages,
        target_rect: options.resize.map(PaperSize::to_rect),
    })
}

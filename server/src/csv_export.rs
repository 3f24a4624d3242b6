use anyhow::{anyhow, Context, Result};
use shared::models::BuoyRecord;

use crate::fields;

const FIXED_COLUMNS: [&str; 6] = ["id", "buoyId", "feedType", "latitude", "longitude", "region"];

/// One row per record; missing readings are empty cells.
pub fn to_csv(records: &[BuoyRecord]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let header = FIXED_COLUMNS
        .iter()
        .copied()
        .chain(fields::COMMON_PARAMETERS.iter().map(|field| field.name));
    writer.write_record(header).context("Failed to write CSV header")?;

    for record in records {
        let mut row = vec![
            record.id.clone(),
            record.buoy_id.clone(),
            record.feed_type.to_string(),
            record.latitude.to_string(),
            record.longitude.to_string(),
            record.region.label().to_string(),
        ];
        row.extend(fields::COMMON_PARAMETERS.iter().map(|field| {
            record
                .reading(field.name)
                .map(|reading| reading.to_string())
                .unwrap_or_default()
        }));
        writer
            .write_record(&row)
            .with_context(|| format!("Failed to write CSV row for {}", record.id))?;
    }

    writer
        .into_inner()
        .map_err(|e| anyhow!("Failed to flush CSV: {}", e.error()))
}

/// `incois_ocean_data_{year}.csv`, keeping only characters safe in a header.
pub fn attachment_name(year: &str) -> String {
    let year: String = year
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    format!("incois_ocean_data_{}.csv", year)
}

/// Moored buoys whose chart pages can be scraped.
pub const MOORED_BUOY_IDS: [&str; 10] = [
    "AD06", "AD07", "AD08", "AD09", "AD10", "BD08", "BD09", "BD10", "BD11", "BD12",
];

/// Chart parameters, spelled exactly as the upstream page expects them.
pub const INCOIS_PARAMETERS: [&str; 52] = [
    "Air Pressure",
    "Air Temperature",
    "Relative Humidity",
    "Rainfall",
    "Wind Direction",
    "Wind Speed",
    "Wind Gust",
    "Irradiance",
    "Radiation In",
    "Current Direction @ 1.20m",
    "Current Direction @ 1.25m",
    "Current Direction @ 003m",
    "Current Speed @ 1.20m",
    "Current Speed @ 1.25m",
    "Current Speed @ 003m",
    "Current Direction @ 015m",
    "Current Direction @ 025m",
    "Current Direction @ 035m",
    "Current Direction @ 050m",
    "Current Direction @ 075m",
    "Current Direction @ 100m",
    "Current Speed @ 015m",
    "Current Speed @ 025m",
    "Current Speed @ 035m",
    "Current Speed @ 050m",
    "Current Speed @ 075m",
    "Current Speed @ 100m",
    "Water Temperature @ 0.5m",
    "Water Temperature @ 001m",
    "Water Temperature @ 005m",
    "Water Temperature @ 010m",
    "Water Temperature @ 015m",
    "Water Temperature @ 020m",
    "Water Temperature @ 030m",
    "Water Temperature @ 050m",
    "Water Temperature @ 075m",
    "Water Temperature @ 100m",
    "Water Temperature @ 200m",
    "Water Temperature @ 500m",
    "Salinity @ 0.5m",
    "Salinity @ 001m",
    "Salinity @ 005m",
    "Salinity @ 010m",
    "Salinity @ 015m",
    "Salinity @ 020m",
    "Salinity @ 030m",
    "Salinity @ 050m",
    "Salinity @ 075m",
    "Salinity @ 100m",
    "Salinity @ 200m",
    "Salinity @ 500m",
    "Significant Wave Height",
];

pub fn is_known_buoy(buoy_id: &str) -> bool {
    MOORED_BUOY_IDS.contains(&buoy_id)
}

/// Exact, case-sensitive match.
pub fn is_known_parameter(parameter: &str) -> bool {
    INCOIS_PARAMETERS.contains(&parameter)
}

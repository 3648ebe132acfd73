//! Physical constants and unit conversions.
//!
//! All building blocks use one fixed system of units:
//! time in ms, potentials in mV, specific capacitance in µF/cm², conductance densities in
//! mS/cm², current densities in µA/cm², concentrations in mM and morphological lengths in µm.
//! Point currents are given in nA.

/// Faraday constant (C/mol)
pub const FARADAY: f64 = 96485.33212;
/// Molar gas constant (J/(mol K))
pub const GAS_CONSTANT: f64 = 8.314462618;
/// Zero degree Celsius in Kelvin
pub const ZERO_CELSIUS: f64 = 273.15;

/// One millisecond, the unit of time.
pub const MILLISECOND: f64 = 1.0;
/// One second
pub const SECOND: f64 = 1e3 * MILLISECOND;
/// One millivolt, the unit of potentials.
pub const MILLIVOLT: f64 = 1.0;
/// One volt
pub const VOLT: f64 = 1e3 * MILLIVOLT;

/// Converts a length from µm to cm.
pub const UM_TO_CM: f64 = 1e-4;
/// Converts an area from µm² to cm².
pub const UM2_TO_CM2: f64 = 1e-8;
/// Converts a current from nA to µA.
pub const NA_TO_UA: f64 = 1e-3;

/// Converts a temperature from Celsius to Kelvin.
pub fn celsius_to_kelvin(celsius: f64) -> f64 {
    celsius + ZERO_CELSIUS
}

/// Converts a temperature from Kelvin to Celsius.
pub fn kelvin_to_celsius(kelvin: f64) -> f64 {
    kelvin - ZERO_CELSIUS
}

/// Converts a point current (nA) into a current density (µA/cm²) for the given area (µm²).
///
/// ```
/// # use braincell_building_blocks::units::current_to_density;
/// // 1 nA onto 1e5 µm² = 1e-3 cm² are 1 µA/cm²
/// assert!((current_to_density(1.0, 1e5) - 1.0).abs() < 1e-12);
/// ```
pub fn current_to_density(current: f64, area: f64) -> f64 {
    current * NA_TO_UA / (area * UM2_TO_CM2)
}

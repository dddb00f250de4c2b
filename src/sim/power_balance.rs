//! Grid power balance between supply, demand, and the storage.
//!
//! Sign convention: storage power is positive while the track draws power
//! from the grid (charging) and negative while it feeds power back.

/// Surplus of generation over consumption (W). Positive means the grid has
/// power to store.
pub fn net_surplus_w(supply_w: f64, demand_w: f64) -> f64 {
    supply_w - demand_w
}

/// Power still missing from the grid after storage has acted (W).
///
/// `demand - supply + storage`: zero when the storage exactly absorbs the
/// surplus or covers the deficit, positive when consumers go short.
pub fn difference_w(supply_w: f64, demand_w: f64, storage_w: f64) -> f64 {
    demand_w - supply_w + storage_w
}

/// Fraction of demand met by supply plus storage output.
///
/// Defined as 1 when there is no demand to satisfy.
pub fn satisfaction(supply_w: f64, demand_w: f64, storage_w: f64) -> f64 {
    if demand_w <= 0.0 {
        1.0
    } else {
        (supply_w - storage_w) / demand_w
    }
}

use crate::MxError;

/// Floating point type used throughout system
pub type Real = f64;

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, MxError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(MxError::NonFinite { what, value: v })
    }
}

/// Finite and strictly greater than zero (time steps, capacities, rates).
pub fn ensure_positive(v: Real, what: &'static str) -> Result<Real, MxError> {
    let v = ensure_finite(v, what)?;
    if v > 0.0 {
        Ok(v)
    } else {
        Err(MxError::NotPositive { what, value: v })
    }
}

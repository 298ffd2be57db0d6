//! Postural angle derivation from raw channel values.
//!
//! ```text
//! horizontal_avg = (R + MM + L) / 3
//! lumbar_angle   = (horizontal_avg + MT) / 2
//! hip_angle      = (MB + MM) / 2
//! ```

use crate::types::{DerivedAngles, RawChannels};

/// Compute the lumbar/hip angle pair. Pure, no error path.
pub fn derive_angles(raw: &RawChannels) -> DerivedAngles {
    let horizontal_avg = (raw.R + raw.MM + raw.L) / 3.0;
    DerivedAngles {
        lumbar_angle: (horizontal_avg + raw.MT) / 2.0,
        hip_angle: (raw.MB + raw.MM) / 2.0,
    }
}

// Copyright 2025 Nodesweep Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Fixed-point helpers for asset amounts. No business logic lives here.

use alloy::primitives::U256;

/// Scale used for elapsed-fraction arithmetic (parts per million).
pub const PPM_SCALE: u64 = 1_000_000;

/// Fraction of the interval `[start, end]` elapsed at `now`, in parts per million,
/// clamped to `[0, PPM_SCALE]`.
///
/// A degenerate range (`end <= start`) reports fully elapsed so callers never
/// extrapolate against it.
pub fn percent_elapsed_ppm(now: u64, start: u64, end: u64) -> u64 {
    if end <= start {
        return PPM_SCALE;
    }
    if now <= start {
        return 0;
    }
    let elapsed = (now - start) as u128;
    let length = (end - start) as u128;
    let ppm = elapsed * PPM_SCALE as u128 / length;
    ppm.min(PPM_SCALE as u128) as u64
}

/// Linearly extrapolate a partial-period amount to a full-period projection:
/// `raw * PPM_SCALE / ppm_elapsed`.
///
/// Reward accrual is roughly uniform over a period, so the projection puts an
/// in-progress interval on the same scale as prior finalized intervals. A fully
/// elapsed (or not-yet-started) period projects to the raw amount itself.
pub fn project_full_interval(raw: U256, ppm_elapsed: u64) -> U256 {
    if ppm_elapsed == 0 || ppm_elapsed >= PPM_SCALE {
        return raw;
    }
    raw * U256::from(PPM_SCALE) / U256::from(ppm_elapsed)
}

/// Saturating sum over asset amounts.
pub fn sum_amounts<I: IntoIterator<Item = U256>>(amounts: I) -> U256 {
    amounts.into_iter().fold(U256::ZERO, |acc, a| acc.saturating_add(a))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projects_half_elapsed_to_double() {
        let projected = project_full_interval(U256::from(10), PPM_SCALE / 2);
        assert_eq!(projected, U256::from(20));
    }

    #[test]
    fn does_not_extrapolate_past_period_end() {
        assert_eq!(project_full_interval(U256::from(10), PPM_SCALE), U256::from(10));
        assert_eq!(project_full_interval(U256::from(10), PPM_SCALE + 1), U256::from(10));
    }

    #[test]
    fn zero_elapsed_projects_to_raw() {
        assert_eq!(project_full_interval(U256::from(10), 0), U256::from(10));
    }

    #[test]
    fn elapsed_fraction_clamps_to_bounds() {
        assert_eq!(percent_elapsed_ppm(50, 100, 200), 0);
        assert_eq!(percent_elapsed_ppm(150, 100, 200), PPM_SCALE / 2);
        assert_eq!(percent_elapsed_ppm(250, 100, 200), PPM_SCALE);
        // Degenerate range counts as fully elapsed.
        assert_eq!(percent_elapsed_ppm(150, 200, 200), PPM_SCALE);
    }

    #[test]
    fn sums_saturate() {
        let total = sum_amounts([U256::from(1), U256::from(2), U256::from(3)]);
        assert_eq!(total, U256::from(6));
        let total = sum_amounts([U256::MAX, U256::from(1)]);
        assert_eq!(total, U256::MAX);
    }
}

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]

use anyhow::{bail, Result as AnyResult};
use crate::domain::PressureSettings;

pub fn validate_settings(s: &PressureSettings) -> AnyResult<()> {
    if s.bytes_per_map == 0 { bail!("bytes_per_map must be > 0"); }
    if !(1..=999).contains(&s.limit_permille) { bail!("limit_permille must be 1..=999"); }
    if s.block_size == 0 { bail!("block_size must be > 0"); }
    if s.blocks_per_batch == 0 { bail!("blocks_per_batch must be > 0"); }
    Ok(())
}

pub fn validate_max_heap(max: u64) -> AnyResult<()> {
    if max == 0 { bail!("max heap must be > 0"); }
    Ok(())
}

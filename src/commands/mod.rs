//! Command implementations

pub mod dump;
pub mod erase;
pub mod info;
pub mod write;

use picprog_core::region::RegionName;

/// Fold a list of region name strings into one flag set
pub fn parse_regions(names: &[String]) -> Result<RegionName, Box<dyn std::error::Error>> {
    let mut set = RegionName::empty();
    for name in names {
        set |= name.parse::<RegionName>()?;
    }
    Ok(set)
}

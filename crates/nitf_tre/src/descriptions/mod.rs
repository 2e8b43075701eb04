//! Layouts shipped with the crate

mod bandsb;
mod engrda;

pub use bandsb::bandsb;
pub use engrda::engrda;

use crate::description::Description;
use crate::error::DescriptionError;
use crate::set::DescriptionSet;

/// Tag of the field holding the payload of a TRE without a known layout
pub const RAW_DATA: &str = "raw_data";

/// The layout used for tags nobody registered: the whole payload as one binary field
pub fn raw_description_set() -> DescriptionSet {
    DescriptionSet::single("raw", Description::opaque(RAW_DATA, "Raw data"))
}

/// Every built-in layout with its tag
pub fn builtins() -> Result<Vec<(&'static str, DescriptionSet)>, DescriptionError> {
    Ok(vec![("ENGRDA", engrda()?), ("BANDSB", bandsb()?)])
}

//! Hyperspectral band parameters (BANDSB)
//!
//! Most of the record is optional: each group of fields is present only when its bit is set in
//! `EXISTENCE_MASK`. Several band level fields share their tag with a cube level field, they are
//! told apart by their loop index suffix.

use crate::description::{Description, FieldSpec, Repeat};
use crate::error::DescriptionError;
use crate::set::DescriptionSet;

fn has(bit: &str) -> Result<FieldSpec, DescriptionError> {
    FieldSpec::when("EXISTENCE_MASK", &format!("& {bit}"))
}

/// Auxiliary parameter value, its format is given by `format_tag`
fn auxiliary_value(format_tag: &str) -> Result<Vec<FieldSpec>, DescriptionError> {
    Ok(vec![
        FieldSpec::when(format_tag, "eq I")?,
        FieldSpec::numeric("APN", 10, "Auxiliary Parameter Integer Value"),
        FieldSpec::CondEnd,
        FieldSpec::when(format_tag, "eq R")?,
        FieldSpec::binary("APR", 4, "Auxiliary Parameter Real Value"),
        FieldSpec::CondEnd,
        FieldSpec::when(format_tag, "eq A")?,
        FieldSpec::alpha("APA", 20, "Auxiliary Parameter ASCII Value"),
        FieldSpec::CondEnd,
    ])
}

pub fn bandsb() -> Result<DescriptionSet, DescriptionError> {
    let mut specs = vec![
        FieldSpec::numeric("COUNT", 5, "Number of Bands"),
        FieldSpec::alpha("RADIOMETRIC_QUANTITY", 24, "Data Representation"),
        FieldSpec::alpha("RADIOMETRIC_QUANTITY_UNIT", 1, "Data Representation Unit"),
        FieldSpec::binary("SCALE_FACTOR", 4, "Cube Scale Factor"),
        FieldSpec::binary("ADDITIVE_FACTOR", 4, "Cube Additive Factor"),
        FieldSpec::numeric("ROW_GSD", 7, "Row Ground Sample Distance"),
        FieldSpec::alpha("ROW_GSD_UNIT", 1, "Units of Row Ground Sample Distance"),
        FieldSpec::numeric("COL_GSD", 7, "Column Ground Sample Distance"),
        FieldSpec::alpha("COL_GSD_UNIT", 1, "Units of Column Ground Sample Distance"),
        FieldSpec::numeric("SPT_RESP_ROW", 7, "Spatial Response Function (Rows)"),
        FieldSpec::alpha("SPT_RESP_UNIT_ROW", 1, "Units of Spatial Response Function (Rows)"),
        FieldSpec::numeric("SPT_RESP_COL", 7, "Spatial Response Function (Cols)"),
        FieldSpec::alpha("SPT_RESP_UNIT_COL", 1, "Units of Spatial Response Function (Cols)"),
        FieldSpec::binary("DATA_FLD_1", 48, "Field reserved for future use"),
        FieldSpec::binary("EXISTENCE_MASK", 4, "Bit-wise Existence Mask Field"),
        has("0x80000000")?,
        FieldSpec::alpha("RADIOMETRIC_ADJUSTMENT_SURFACE", 24, "Adjustment Surface"),
        FieldSpec::binary(
            "ATMOSPHERIC_ADJUSTMENT_ALTITUDE",
            4,
            "Adjustment Altitude Above WGS84 Ellipsoid",
        ),
        FieldSpec::CondEnd,
        has("0x40000000")?,
        FieldSpec::numeric("DIAMETER", 7, "Diameter of the lens"),
        FieldSpec::CondEnd,
        has("0x20000000")?,
        FieldSpec::binary("DATA_FLD_2", 32, "Field reserved for future use"),
        FieldSpec::CondEnd,
        has("0x01F80000")?,
        FieldSpec::alpha("WAVE_LENGTH_UNIT", 1, "Wave Length Units"),
        FieldSpec::CondEnd,
        // band level parameters
        FieldSpec::repeat(Repeat::reference("COUNT")),
        has("0x10000000")?,
        FieldSpec::alpha("BANDID", 50, "Band n Identifier"),
        FieldSpec::CondEnd,
        has("0x08000000")?,
        FieldSpec::numeric("BAD_BAND", 1, "Bad Band Flag"),
        FieldSpec::CondEnd,
        has("0x04000000")?,
        FieldSpec::numeric("NIIRS", 3, "NIIRS Value"),
        FieldSpec::CondEnd,
        has("0x02000000")?,
        FieldSpec::numeric("FOCAL_LEN", 5, "Band n Focal length"),
        FieldSpec::CondEnd,
        has("0x01000000")?,
        FieldSpec::numeric("CWAVE", 7, "Band n Center Response Wavelength"),
        FieldSpec::CondEnd,
        has("0x00800000")?,
        FieldSpec::numeric("FWHM", 7, "Band n Width"),
        FieldSpec::CondEnd,
        has("0x00400000")?,
        FieldSpec::numeric("FWHM_UNC", 7, "Band n Width Uncertainty"),
        FieldSpec::CondEnd,
        has("0x00200000")?,
        FieldSpec::numeric("NOM_WAVE", 7, "Band n Nominal Wavelength"),
        FieldSpec::CondEnd,
        has("0x00100000")?,
        FieldSpec::numeric("NOM_WAVE_UNC", 7, "Band n Nominal Wavelength Uncertainty"),
        FieldSpec::CondEnd,
        has("0x00080000")?,
        FieldSpec::numeric("LBOUND", 7, "Band n Lower Wavelength Bound"),
        FieldSpec::numeric("UBOUND", 7, "Band n Upper Wavelength Bound"),
        FieldSpec::CondEnd,
        has("0x00040000")?,
        FieldSpec::binary("SCALE_FACTOR", 4, "Individual Scale Factor"),
        FieldSpec::binary("ADDITIVE_FACTOR", 4, "Individual Additive Factor"),
        FieldSpec::CondEnd,
        has("0x00020000")?,
        FieldSpec::alpha("START_TIME", 16, "Start Time"),
        FieldSpec::CondEnd,
        has("0x00010000")?,
        FieldSpec::numeric("INT_TIME", 6, "Integration Time"),
        FieldSpec::CondEnd,
        has("0x00008000")?,
        FieldSpec::numeric("CALDRK", 6, "Band n Calibration (Dark)"),
        FieldSpec::numeric("CALIBRATION_SENSITIVITY", 5, "Band n Calibration (Increment)"),
        FieldSpec::CondEnd,
        has("0x00004000")?,
        FieldSpec::numeric("ROW_GSD", 7, "Band n Spatial Response Interval (Row)"),
        has("0x00002000")?,
        FieldSpec::numeric(
            "ROW_GSD_UNC",
            7,
            "Band n Spatial Response Interval Uncertainty (Row)",
        ),
        FieldSpec::CondEnd,
        FieldSpec::alpha("ROW_GSD_UNIT", 1, "Unit of Row Spacing"),
        FieldSpec::numeric("COL_GSD", 7, "Band n Spatial Response Interval (Col)"),
        has("0x00002000")?,
        FieldSpec::numeric(
            "COL_GSD_UNC",
            7,
            "Band n Spatial Response Interval Uncertainty (Col)",
        ),
        FieldSpec::CondEnd,
        FieldSpec::alpha("COL_GSD_UNIT", 1, "Unit of Column Spacing"),
        FieldSpec::CondEnd,
        has("0x00001000")?,
        FieldSpec::numeric("BKNOISE", 5, "Band n Background Noise"),
        FieldSpec::numeric("SCNNOISE", 5, "Band n Scene Noise"),
        FieldSpec::CondEnd,
        has("0x00000800")?,
        FieldSpec::numeric(
            "SPT_RESP_FUNCTION_ROW",
            7,
            "Band n Spatial Response Function (Row)",
        ),
        has("0x00000400")?,
        FieldSpec::numeric(
            "SPT_RESP_UNC_ROW",
            7,
            "Band n Spatial Response Function Uncertainty (Row)",
        ),
        FieldSpec::CondEnd,
        FieldSpec::alpha("SPT_RESP_UNIT_ROW", 1, "Unit of Spatial Response (Row)"),
        FieldSpec::numeric(
            "SPT_RESP_FUNCTION_COL",
            7,
            "Band n Spatial Response Function (Col)",
        ),
        has("0x00000400")?,
        FieldSpec::numeric(
            "SPT_RESP_UNC_COL",
            7,
            "Band n Spatial Response Function Uncertainty (Col)",
        ),
        FieldSpec::CondEnd,
        FieldSpec::alpha("SPT_RESP_UNIT_COL", 1, "Unit of Spatial Response (Col)"),
        FieldSpec::CondEnd,
        has("0x00000200")?,
        FieldSpec::binary("DATA_FLD_3", 16, "Field reserved for future use"),
        FieldSpec::CondEnd,
        has("0x00000100")?,
        FieldSpec::binary("DATA_FLD_4", 24, "Field reserved for future use"),
        FieldSpec::CondEnd,
        has("0x00000080")?,
        FieldSpec::binary("DATA_FLD_5", 32, "Field reserved for future use"),
        FieldSpec::CondEnd,
        has("0x00000040")?,
        FieldSpec::binary("DATA_FLD_6", 48, "Field reserved for future use"),
        FieldSpec::CondEnd,
        FieldSpec::LoopEnd,
        // auxiliary parameters
        has("0x00000001")?,
        FieldSpec::numeric("NUM_AUX_B", 2, "Number of Auxiliary Band Level Parameters (m)"),
        FieldSpec::numeric("NUM_AUX_C", 2, "Number of Auxiliary Cube Level Parameters (k)"),
        FieldSpec::repeat(Repeat::reference("NUM_AUX_B")),
        FieldSpec::alpha("BAPF", 1, "Band Auxiliary Parameter Value Format"),
        FieldSpec::alpha("UBAP", 7, "Unit of Band Auxiliary Parameter"),
        FieldSpec::repeat(Repeat::reference("COUNT")),
    ];
    specs.extend(auxiliary_value("BAPF")?);
    specs.extend([
        FieldSpec::LoopEnd,
        FieldSpec::LoopEnd,
        FieldSpec::repeat(Repeat::reference("NUM_AUX_C")),
        FieldSpec::alpha("CAPF", 1, "Cube Auxiliary Parameter Value Format"),
        FieldSpec::alpha("UCAP", 7, "Unit of Cube Auxiliary Parameter"),
    ]);
    specs.extend(auxiliary_value("CAPF")?);
    specs.extend([FieldSpec::LoopEnd, FieldSpec::CondEnd, FieldSpec::End]);

    Ok(DescriptionSet::single("BANDSB", Description::new(specs)?))
}

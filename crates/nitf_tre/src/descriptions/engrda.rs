//! Engineering data (ENGRDA)

use crate::description::{Description, FieldSpec, Repeat, Rule, Width};
use crate::error::DescriptionError;
use crate::set::DescriptionSet;

pub fn engrda() -> Result<DescriptionSet, DescriptionError> {
    let description = Description::new(vec![
        FieldSpec::alpha("RESRC", 20, "Unique Source System Name"),
        FieldSpec::numeric("RECNT", 3, "Record Entry Count"),
        FieldSpec::repeat(Repeat::reference("RECNT")),
        FieldSpec::numeric("ENGLN", 2, "Engineering Data Label Length"),
        FieldSpec::alpha("ENGLBL", Width::reference("ENGLN"), "Engineering Data Label"),
        FieldSpec::numeric("ENGMTXC", 4, "Engineering Matrix Data Column Count"),
        FieldSpec::numeric("ENGMTXR", 4, "Engineering Matrix Data Row Count"),
        FieldSpec::alpha("ENGTYP", 1, "Value Type of Engineering Data Element")
            .with_rule(Rule::one_of(["A", "B", "I", "S", "R", "C"])),
        FieldSpec::numeric("ENGDTS", 1, "Engineering Data Element Size"),
        FieldSpec::alpha("ENGDATU", 2, "Engineering Data Units"),
        FieldSpec::numeric("ENGDATC", 8, "Engineering Data Count"),
        FieldSpec::binary(
            "ENGDATA",
            Width::computed("ENGDATC ENGDTS *")?,
            "Engineering Data",
        ),
        FieldSpec::LoopEnd,
        FieldSpec::End,
    ])?;

    Ok(DescriptionSet::single("ENGRDA", description))
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    use crate::descriptions::engrda;
    use crate::error::Result;
    use crate::interpreter::decode;

    #[rustfmt::skip]
    const RECORD: &[u8] = &[
        // RESRC
        b'N', b'I', b'T', b'R', b'O', b' ', b'T', b'E', b'S', b'T',
        b' ', b' ', b' ', b' ', b' ', b' ', b' ', b' ', b' ', b' ',
        // RECNT
        b'0', b'0', b'1',
        // ENGLN, ENGLBL
        b'0', b'7', b'E', b'N', b'G', b'T', b'E', b'M', b'P',
        // ENGMTXC, ENGMTXR
        b'0', b'0', b'0', b'1', b'0', b'0', b'0', b'1',
        // ENGTYP, ENGDTS, ENGDATU
        b'I', b'2', b't', b'C',
        // ENGDATC
        b'0', b'0', b'0', b'0', b'0', b'0', b'0', b'1',
        // ENGDATA
        0x01, 0x2C,
    ];

    #[test]
    fn decodes_record() -> Result<()> {
        let set = engrda()?;
        let decoded = decode(&set, "ENGRDA", Cursor::new(RECORD), Some(RECORD.len()))?;
        assert_eq!(decoded.consumed, 54);

        let tre = decoded.tre;
        assert!(tre.warnings().is_empty());
        assert_eq!(tre.field("RESRC").unwrap().as_string(), "NITRO TEST");
        assert_eq!(tre.field("ENGLBL#0").unwrap().as_string(), "ENGTEMP");
        assert_eq!(tre.field("ENGDATA#0").unwrap().as_integer()?, 300);
        assert_eq!(tre.encode()?, RECORD);
        Ok(())
    }
}

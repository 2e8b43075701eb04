//! This library reads, writes and creates the **Tagged Record Extensions** (TREs) carried by
//! *NITF* imagery files.
//!
//! # TRE Format Documentation
//!
//! NITF file, image, graphic and text headers end with extension areas holding any number of
//! TREs. Each TRE is a vendor defined record whose layout is published separately from the NITF
//! standard, so this crate does not hard code layouts: a [`description::Description`] lists the
//! fields of a record and one interpreter walks it to decode and encode bytes.
//!
//! ## Framing
//!
//! Inside an extension area every TRE is preceded by an 11 byte header:
//!
//! | Offset (bytes) | Field   | Description                                              |
//! |----------------|---------|----------------------------------------------------------|
//! | 0x0000         | CETAG   | 6 bytes: tag, BCS-A left justified and padded with blanks |
//! | 0x0006         | CEL     | 5 bytes: payload length, BCS-N decimal digits            |
//! | 0x000B         | CEDATA  | CEL bytes: the payload, laid out by the description      |
//!
//! ## Field Kinds
//!
//! | Kind    | Content                        | Padding                                    |
//! |---------|--------------------------------|--------------------------------------------|
//! | BCS-A   | printable ASCII `0x20..=0x7E`  | trailing blanks                            |
//! | BCS-N   | digits, sign, `.`, `-`, `/`    | leading zeros, a sign stays in front       |
//! | Binary  | raw bytes                      | none, integers and reals are big-endian    |
//!
//! ## Descriptions
//!
//! A description is a flat list of instructions:
//!
//! - **Scalar**: one field of a kind and a width. The width is a fixed number of bytes, the value
//!   of an earlier field, a postfix expression over earlier fields (`ENGDATC ENGDTS *`) or all
//!   remaining bytes. A computed width of zero skips the field.
//! - **LoopStart / LoopEnd**: repeat the enclosed instructions a fixed number of times or as many
//!   times as an earlier field says. Fields inside loops are stored under qualified keys carrying
//!   the loop indices, outermost first: `ITEM#1`, `APN#0.3`.
//! - **CondStart / CondEnd**: the enclosed instructions are present only when a comparison on an
//!   earlier field holds: `eq A`, `ne A`, `== 3`, `!= 3`, `< 3`, `<= 3`, `> 3`, `>= 3` or a bit
//!   mask test `& 0x80000000`.
//! - **End**: stops the walk, bytes past it are left alone.
//!
//! References are resolved against the fields produced so far, innermost loop iteration first,
//! so encoding a store reproduces the bytes it was decoded from.
//!
//! ## Variants
//!
//! A tag may have several layouts. A [`set::DescriptionSet`] lists them with the payload length
//! each one is meant for: the first variant whose hint equals the declared length is used,
//! otherwise the default one.
//!
//! ```
//! use std::io::Cursor;
//! use nitf_tre::description::{Description, FieldSpec, Repeat};
//! use nitf_tre::set::DescriptionSet;
//!
//! # fn doit() -> nitf_tre::error::Result<()> {
//! let set = DescriptionSet::single("items", Description::new(vec![
//!     FieldSpec::numeric("N", 3, "Number of items"),
//!     FieldSpec::repeat(Repeat::reference("N")),
//!     FieldSpec::alpha("ITEM", 4, "Item"),
//!     FieldSpec::LoopEnd,
//!     FieldSpec::End,
//! ])?);
//!
//! let decoded = nitf_tre::decode(&set, "ITEMS", Cursor::new(b"002ABCDWXYZ"), Some(11))?;
//! assert_eq!(decoded.tre.field("ITEM#1").unwrap().as_string(), "WXYZ");
//! assert_eq!(decoded.tre.encode()?, b"002ABCDWXYZ");
//! # Ok(())
//! # }
//! # doit().unwrap();
//! ```

pub mod description;
pub mod descriptions;
pub mod error;
pub mod expr;
pub mod extensions;
pub mod field;
pub mod interpreter;
pub mod registry;
pub mod set;
pub mod store;
pub mod tre;
pub mod types;

pub use extensions::{Extensions, ReadOptions};
pub use field::{Field, FieldKind};
pub use interpreter::{decode, encode, Decoded};
pub use registry::{DescriptionSource, Registry};
pub use tre::Tre;

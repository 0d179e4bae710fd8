//! SS7-over-IP signalling decoders
//!
//! - **MTP3** - service information octet and routing label
//! - **M3UA** - MTP3 User Adaptation Layer (drafts 5/6/7, RFC 3332/4666)
//! - **SUA** - SCCP User Adaptation (draft 08, RFC 3868)
//!
//! All of them share the TLV parameter loop in [`tlv`].

pub mod association;
pub mod global_title;
pub mod m3ua;
pub mod mtp3;
pub mod sua;
pub mod tlv;

pub use association::{Association, AssociationKey, AssociationTable};
pub use m3ua::M3uaVersion;
pub use sua::{SuaSession, SuaVersion};
pub use tlv::{padding, ParameterWalker, SigtranContext};

/// Well-known subsystem numbers used as `sua.ssn` keys
pub mod ssn {
    pub const HLR: u8 = 6;
    pub const VLR: u8 = 7;
    pub const MSC: u8 = 8;
    pub const GMLC: u8 = 145;
    pub const GSMSCF: u8 = 147;
    pub const SGSN: u8 = 149;
}

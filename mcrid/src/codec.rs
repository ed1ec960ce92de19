// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! Register-level encoding of a multicast RID table row.
//!
//! A row is written as a header word, the spray group pointer words, and
//! then one word per directive slot.  Slots past the end of the directive
//! list hold the unused encoding, with both port offsets null.

use crate::config::FabricConfig;
use crate::directive::{Directive, SidePort, VcHop};
use crate::error::{McError, McResult};
use crate::flags;

/// Spray group pointers packed into each pointer register
pub const PTRS_PER_WORD: usize = 4;
/// The TCP field is 3 bits wide
pub const MAX_COLUMN_PAIRS: u8 = 8;
/// Offsets are 4 bits wide, and 0xf is reserved for "no port"
pub const MAX_PORTS_PER_COLUMN: u8 = 15;
/// Spray group pointers are a single byte
pub const MAX_DIRECTIVES_PER_ROW: usize = 255;
/// The spray group count is 4 bits wide, with 0 standing in for 16
pub const MAX_SPRAY_GROUPS: usize = 16;

pub const NULL_OFFSET: u8 = 0xf;
/// A directive slot naming no ports
pub const UNUSED_DIRECTIVE: u32 = 0x0000_078f;

// Directive word layout
const OFFSET_MASK: u32 = 0xf;
const VCHOP_MASK: u32 = 0x3;
const TCP_MASK: u32 = 0x7;
const EVEN_OFFSET_SHIFT: u32 = 0;
const EVEN_ALT_PATH_SHIFT: u32 = 4;
const EVEN_VCHOP_SHIFT: u32 = 5;
const ODD_OFFSET_SHIFT: u32 = 7;
const ODD_ALT_PATH_SHIFT: u32 = 11;
const ODD_VCHOP_SHIFT: u32 = 12;
const TCP_SHIFT: u32 = 14;
const PORT_FLAG_SHIFT: u32 = 17;
const CONTINUE_ROUND_SHIFT: u32 = 18;
const LAST_ROUND_SHIFT: u32 = 19;

// Header word layout
const MC_SIZE_MASK: u32 = 0xff;
const GROUP_COUNT_MASK: u32 = 0xf;
const EXT_PTR_MASK: u32 = 0xff;
const MC_SIZE_SHIFT: u32 = 0;
const GROUP_COUNT_SHIFT: u32 = 8;
const EXT_PTR_SHIFT: u32 = 12;
const EXT_PTR_VALID_SHIFT: u32 = 20;
const NO_DYN_RSP_SHIFT: u32 = 21;
const ENTRY_VALID_SHIFT: u32 = 22;

const PTR_BITS: usize = 8;

fn field(word: u32, shift: u32, mask: u32) -> u32 {
    (word >> shift) & mask
}

fn bit(word: u32, shift: u32) -> bool {
    word & (1 << shift) != 0
}

fn flag(value: bool, shift: u32) -> u32 {
    u32::from(value) << shift
}

struct SideLayout {
    offset: u32,
    alt_path: u32,
    vchop: u32,
}

const EVEN_SIDE: SideLayout = SideLayout {
    offset: EVEN_OFFSET_SHIFT,
    alt_path: EVEN_ALT_PATH_SHIFT,
    vchop: EVEN_VCHOP_SHIFT,
};

const ODD_SIDE: SideLayout = SideLayout {
    offset: ODD_OFFSET_SHIFT,
    alt_path: ODD_ALT_PATH_SHIFT,
    vchop: ODD_VCHOP_SHIFT,
};

impl SideLayout {
    fn encode(&self, port: Option<&SidePort>) -> u32 {
        match port {
            None => u32::from(NULL_OFFSET) << self.offset,
            Some(p) => {
                assert!(p.offset < NULL_OFFSET, "offset {} too big", p.offset);
                u32::from(p.offset) << self.offset
                    | flag(p.alt_path, self.alt_path)
                    | u32::from(u8::from(p.vchop)) << self.vchop
            }
        }
    }

    fn decode(&self, word: u32) -> Option<SidePort> {
        let offset = field(word, self.offset, OFFSET_MASK) as u8;
        if offset == NULL_OFFSET {
            return None;
        }
        let vchop = match field(word, self.vchop, VCHOP_MASK) {
            0 => VcHop::Pass,
            1 => VcHop::Invert,
            2 => VcHop::Force0,
            _ => VcHop::Force1,
        };
        Some(SidePort {
            offset,
            vchop,
            alt_path: bit(word, self.alt_path),
        })
    }
}

/// Encode a single directive.  The round size is bookkeeping and is not
/// carried in the register.
pub fn encode_directive(d: &Directive) -> u32 {
    assert!(d.tcp < MAX_COLUMN_PAIRS, "tcp {} too large", d.tcp);
    EVEN_SIDE.encode(d.even.as_ref())
        | ODD_SIDE.encode(d.odd.as_ref())
        | u32::from(d.tcp) << TCP_SHIFT
        | flag(d.port_flag, PORT_FLAG_SHIFT)
        | flag(d.continue_round, CONTINUE_ROUND_SHIFT)
        | flag(d.last_round, LAST_ROUND_SHIFT)
}

pub fn decode_directive(word: u32) -> Directive {
    Directive {
        tcp: field(word, TCP_SHIFT, TCP_MASK) as u8,
        even: EVEN_SIDE.decode(word),
        odd: ODD_SIDE.decode(word),
        port_flag: bit(word, PORT_FLAG_SHIFT),
        continue_round: bit(word, CONTINUE_ROUND_SHIFT),
        last_round: bit(word, LAST_ROUND_SHIFT),
        round_size: 0,
    }
}

/// The fixed fields at the start of each row.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RowHeader {
    /// The number of responses expected for a packet replicated by this row
    pub mc_size: u16,
    pub num_spray_groups: usize,
    /// Index of a continuation row in the extended table
    pub ext_ptr: Option<u8>,
    pub no_dyn_rsp: bool,
    pub valid: bool,
}

impl RowHeader {
    /// The header of a row that the hardware will ignore.
    pub fn invalid() -> Self {
        RowHeader {
            mc_size: 1,
            num_spray_groups: MAX_SPRAY_GROUPS,
            ext_ptr: None,
            no_dyn_rsp: false,
            valid: false,
        }
    }
}

pub fn encode_header(h: &RowHeader) -> McResult<u32> {
    if h.mc_size == 0 || usize::from(h.mc_size) > 1 + MC_SIZE_MASK as usize {
        return Err(McError::bad_arg(format!(
            "mc size {} out of range",
            h.mc_size
        )));
    }
    if h.num_spray_groups == 0 || h.num_spray_groups > MAX_SPRAY_GROUPS {
        return Err(McError::bad_arg(format!(
            "spray group count {} out of range",
            h.num_spray_groups
        )));
    }

    // Both of these fit after the range checks above
    let mc_size = u32::from(h.mc_size - 1);
    let groups = h.num_spray_groups as u32 & GROUP_COUNT_MASK;

    Ok(mc_size << MC_SIZE_SHIFT
        | groups << GROUP_COUNT_SHIFT
        | u32::from(h.ext_ptr.unwrap_or(0)) << EXT_PTR_SHIFT
        | flag(h.ext_ptr.is_some(), EXT_PTR_VALID_SHIFT)
        | flag(h.no_dyn_rsp, NO_DYN_RSP_SHIFT)
        | flag(h.valid, ENTRY_VALID_SHIFT))
}

pub fn decode_header(word: u32) -> RowHeader {
    let groups = field(word, GROUP_COUNT_SHIFT, GROUP_COUNT_MASK) as usize;
    RowHeader {
        mc_size: field(word, MC_SIZE_SHIFT, MC_SIZE_MASK) as u16 + 1,
        num_spray_groups: if groups == 0 { MAX_SPRAY_GROUPS } else { groups },
        ext_ptr: bit(word, EXT_PTR_VALID_SHIFT)
            .then_some(field(word, EXT_PTR_SHIFT, EXT_PTR_MASK) as u8),
        no_dyn_rsp: bit(word, NO_DYN_RSP_SHIFT),
        valid: bit(word, ENTRY_VALID_SHIFT),
    }
}

/// The logical contents of one table row.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct McRidEntry {
    pub header: RowHeader,
    /// Index of each spray group's first directive
    pub spray_group_ptrs: Vec<u8>,
    /// The in-use directives, without the trailing unused slots
    pub directives: Vec<Directive>,
}

impl McRidEntry {
    pub fn invalid() -> Self {
        McRidEntry {
            header: RowHeader::invalid(),
            spray_group_ptrs: Vec::new(),
            directives: Vec::new(),
        }
    }
}

/// The raw register contents of one table row.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RowRegisters {
    pub header: u32,
    pub spray_group_ptrs: Vec<u32>,
    pub directives: Vec<u32>,
}

impl RowRegisters {
    /// The registers of an invalid row, with every directive slot unused.
    pub fn invalid(config: &FabricConfig) -> Self {
        RowRegisters {
            header: 0,
            spray_group_ptrs: vec![0; config.pointer_words()],
            directives: vec![UNUSED_DIRECTIVE; config.directives_per_row],
        }
    }

    pub fn encode(config: &FabricConfig, entry: &McRidEntry) -> McResult<Self> {
        if !entry.header.valid {
            return Ok(Self::invalid(config));
        }

        let header = encode_header(&entry.header)?;
        let ngroups = entry.header.num_spray_groups;
        if ngroups > config.max_spray_groups {
            return Err(McError::bad_arg(format!(
                "{ngroups} spray groups exceed the limit of {}",
                config.max_spray_groups
            )));
        }
        if entry.spray_group_ptrs.len() != ngroups {
            return Err(McError::bad_arg(format!(
                "{} spray group pointers for {ngroups} groups",
                entry.spray_group_ptrs.len()
            )));
        }
        if entry.directives.len() > config.directives_per_row {
            return Err(McError::TableOverflow {
                group: ngroups - 1,
                needed: entry.directives.len(),
                capacity: config.directives_per_row,
            });
        }
        if let Some(ptr) = entry
            .spray_group_ptrs
            .iter()
            .find(|&&p| usize::from(p) >= entry.directives.len())
        {
            return Err(McError::bad_arg(format!(
                "spray group pointer {ptr} is past the last directive"
            )));
        }

        let mut spray_group_ptrs = vec![0; config.pointer_words()];
        for (g, ptr) in entry.spray_group_ptrs.iter().enumerate() {
            let shift = (g % PTRS_PER_WORD) * PTR_BITS;
            spray_group_ptrs[g / PTRS_PER_WORD] |= u32::from(*ptr) << shift;
        }

        let mut directives: Vec<u32> =
            entry.directives.iter().map(encode_directive).collect();
        directives.resize(config.directives_per_row, UNUSED_DIRECTIVE);

        Ok(RowRegisters {
            header,
            spray_group_ptrs,
            directives,
        })
    }

    pub fn decode(&self, config: &FabricConfig) -> McResult<McRidEntry> {
        let header = decode_header(self.header);
        if !header.valid {
            return Ok(McRidEntry {
                header,
                spray_group_ptrs: Vec::new(),
                directives: Vec::new(),
            });
        }
        if header.num_spray_groups > config.max_spray_groups {
            return Err(McError::bad_arg(format!(
                "row claims {} spray groups, limit is {}",
                header.num_spray_groups, config.max_spray_groups
            )));
        }

        let spray_group_ptrs = (0..header.num_spray_groups)
            .map(|g| {
                let shift = (g % PTRS_PER_WORD) * PTR_BITS;
                (self.spray_group_ptrs[g / PTRS_PER_WORD] >> shift) as u8
            })
            .collect();

        let mut directives: Vec<Directive> = self
            .directives
            .iter()
            .map(|w| decode_directive(*w))
            .take_while(|d| !d.is_unused())
            .collect();
        flags::stamp_round_sizes(&mut directives);

        Ok(McRidEntry {
            header,
            spray_group_ptrs,
            directives,
        })
    }

    /// The row as it is laid out in the register file.
    pub fn words(&self) -> Vec<u32> {
        std::iter::once(self.header)
            .chain(self.spray_group_ptrs.iter().copied())
            .chain(self.directives.iter().copied())
            .collect()
    }

    pub fn from_words(config: &FabricConfig, words: &[u32]) -> McResult<Self> {
        if words.len() != config.row_words() {
            return Err(McError::bad_arg(format!(
                "row has {} words, expected {}",
                words.len(),
                config.row_words()
            )));
        }
        let (header, rest) = words.split_at(1);
        let (ptrs, directives) = rest.split_at(config.pointer_words());
        Ok(RowRegisters {
            header: header[0],
            spray_group_ptrs: ptrs.to_vec(),
            directives: directives.to_vec(),
        })
    }
}

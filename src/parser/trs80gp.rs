//! Import of trs80gp debug dumps.
//!
//! trs80gp writes something that is almost JSON: object keys are not
//! quoted. Keys are quoted with a regex pass and the result is parsed
//! strictly. The quoting step is best-effort and kept behind
//! [`normalize_keys`] so a real parser can replace it.

use crate::error::{Result, XrayError};
use crate::state::{Registers, SutContext, make_block};
use regex::Regex;
use serde::Deserialize;

pub const IMPORT_SYSTEM_NAME: &str = "trs80gp-import";

#[derive(Debug, Deserialize)]
struct Trs80GpDump {
    #[serde(rename = "AF")]
    af: u16,
    #[serde(rename = "AFp")]
    af_alt: u16,
    #[serde(rename = "BC")]
    bc: u16,
    #[serde(rename = "BCp")]
    bc_alt: u16,
    #[serde(rename = "DE")]
    de: u16,
    #[serde(rename = "DEp")]
    de_alt: u16,
    #[serde(rename = "HL")]
    hl: u16,
    #[serde(rename = "HLp")]
    hl_alt: u16,
    #[serde(rename = "IX")]
    ix: u16,
    #[serde(rename = "IY")]
    iy: u16,
    #[serde(rename = "PC")]
    pc: u16,
    #[serde(rename = "SP")]
    sp: u16,
    #[serde(rename = "I")]
    i: u8,
    #[serde(rename = "R")]
    r: u8,
    #[serde(rename = "IFF1")]
    iff1: u8,
    #[serde(rename = "IFF2")]
    iff2: u8,
    mem: Vec<u8>,
}

/// A dump converted to the shapes the session consumes.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedSnapshot {
    pub context: SutContext,
    pub registers: Registers,
    /// Offset-prefixed block starting at address 0.
    pub memory_block: Vec<u8>,
}

/// Quotes bare (or single-quoted) object keys: `AF: 1` -> `"AF": 1`.
pub fn normalize_keys(content: &str) -> Result<String> {
    let re = Regex::new(r#"(['"])?([a-z0-9A-Z_]+)(['"])?:"#)
        .map_err(|e| XrayError::MalformedImport(e.to_string()))?;
    Ok(re.replace_all(content, r#""${2}": "#).into_owned())
}

pub fn parse_trs80gp(content: &str) -> Result<ImportedSnapshot> {
    let fixed = normalize_keys(content)?;
    let dump: Trs80GpDump =
        serde_json::from_str(&fixed).map_err(|e| XrayError::MalformedImport(e.to_string()))?;

    let context = SutContext {
        system_name: IMPORT_SYSTEM_NAME.to_string(),
        model: 0,
        running: false,
        alt_single_step_mode: false,
    };

    // trs80gp has a single 8-bit R. It can't be split into the two halves
    // the SUT reports, so it all goes into the low half.
    let registers = Registers {
        af: dump.af,
        bc: dump.bc,
        de: dump.de,
        hl: dump.hl,
        af_alt: dump.af_alt,
        bc_alt: dump.bc_alt,
        de_alt: dump.de_alt,
        hl_alt: dump.hl_alt,
        ix: dump.ix,
        iy: dump.iy,
        sp: dump.sp,
        pc: dump.pc,
        i: dump.i,
        r1: dump.r,
        r2: 0,
        iff1: dump.iff1,
        iff2: dump.iff2,
        interrupt_mode: 0,
        t_states: 0,
        clock_speed: 0.0,
    };

    Ok(ImportedSnapshot {
        context,
        registers,
        memory_block: make_block(0, &dump.mem),
    })
}

//! ICSP command opcodes
//!
//! Each command is an 8-bit byte clocked MSB-first; commands with a
//! payload are followed by 24 bits carrying the value shifted left by one
//! (trailing stop bit).

/// Load the target PC from a 24-bit payload (low 22 bits)
pub const LOAD_PC: u8 = 0x80;
/// Read the word at PC
pub const READ_NVM: u8 = 0xFC;
/// Read the word at PC, then advance PC by one word
pub const READ_NVM_INC: u8 = 0xFE;
/// Program the word at PC
pub const WRITE_NVM: u8 = 0xC0;
/// Program the word at PC, then advance PC by one word
pub const WRITE_NVM_INC: u8 = 0xE0;
/// Erase the regions selected by the payload bitmap
pub const BULK_ERASE: u8 = 0x18;
/// Advance PC by one word
pub const INC_PC: u8 = 0xF8;

/// Bulk erase bitmap: EEPROM select bit
pub const ERASE_EEPROM_BIT: u8 = 0;
/// Bulk erase bitmap: program flash select bit
pub const ERASE_PROGRAM_BIT: u8 = 1;
/// Bulk erase bitmap: user ID select bit
pub const ERASE_USER_BIT: u8 = 2;
/// Bulk erase bitmap: configuration select bit
pub const ERASE_CONFIG_BIT: u8 = 3;

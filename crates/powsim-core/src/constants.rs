pub const BYTE: usize = 8;
pub const HASH_SIZE: usize = 32;
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;

/// Separates the fields of a transaction and of a block preimage.
pub const FIELD_SEPARATOR: char = '|';
/// Separates transactions inside a block preimage.
pub const TX_SEPARATOR: char = ';';

/// Leading zero bits required by the default difficulty target (`2^240 - 1`).
pub const DEFAULT_TARGET_ZERO_BITS: u32 = 16;

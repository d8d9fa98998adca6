//! Bit-packed word-array codec shared by every chunk schema generation.
//!
//! Block indices are packed into `i64` words in one of two layouts:
//!
//! - **word-aligned** (newer saves): each word holds `floor(64 / bits)`
//!   entries and an entry never straddles a word boundary, leaving the top
//!   bits of every word as padding.
//! - **spanning** (older saves): entries are packed back to back with no
//!   padding, so an entry may straddle two adjacent words.
//!
//! Light values are nibbles, two per byte, low nibble first.
//!
//! Reads are point lookups: render queries touch single blocks, not whole
//! arrays, so nothing here materializes a 4096-entry vector. The `pack_*`
//! functions are the write-side mirror, used by world-building tooling and
//! the test suites to produce fixtures the readers must agree with.

/// Bits per block-index entry implied by a section's word count.
///
/// This is `wordCount * 64 / 4096`, the width the encoded array actually
/// provides per entry. It is never derived from the palette length: a damaged
/// file may pack wider entries than the palette justifies, and those decode
/// to out-of-range indices handled at query time.
pub fn block_bits_per_entry(word_count: usize) -> u32 {
    (word_count >> 6) as u32
}

/// Read entry `index` from a word-aligned packed array.
/// A zero-length array, a zero width, or an index past the backing words
/// reads as 0.
pub fn read_value(words: &[i64], index: usize, bits_per_entry: u32) -> u64 {
    if words.is_empty() || bits_per_entry == 0 || bits_per_entry > 64 {
        return 0;
    }
    let entries_per_word = (64 / bits_per_entry) as usize;
    let word_index = index / entries_per_word;
    if word_index >= words.len() {
        return 0;
    }
    let bit_offset = (index % entries_per_word) as u32 * bits_per_entry;
    ((words[word_index] as u64) >> bit_offset) & mask(bits_per_entry)
}

/// Read entry `index` from a spanning packed array, merging two words when
/// the entry straddles a boundary. Same degradation rules as [`read_value`].
pub fn read_value_spanning(words: &[i64], index: usize, bits_per_entry: u32) -> u64 {
    if words.is_empty() || bits_per_entry == 0 || bits_per_entry > 64 {
        return 0;
    }
    let bits = bits_per_entry as usize;
    let bit_index = index * bits;
    let start_word_index = bit_index / 64;
    let start_offset = (bit_index % 64) as u32;
    if start_word_index >= words.len() {
        return 0;
    }

    if start_offset as usize + bits <= 64 {
        // Entry fits in a single word
        ((words[start_word_index] as u64) >> start_offset) & mask(bits_per_entry)
    } else {
        // Entry spans two words
        let low_bits = (words[start_word_index] as u64) >> start_offset;
        let high_bits = match words.get(start_word_index + 1) {
            Some(&word) => word as u64,
            None => 0,
        };
        (low_bits | (high_bits << (64 - start_offset))) & mask(bits_per_entry)
    }
}

/// Read the 4-bit value at `index` from a nibble array (two per byte, even
/// index in the low half). A zero-length array reads as 0.
pub fn read_nibble(bytes: &[u8], index: usize) -> u8 {
    let byte_index = index / 2;
    if byte_index >= bytes.len() {
        return 0;
    }
    let byte = bytes[byte_index];
    if index % 2 == 0 {
        byte & 0xF
    } else {
        byte >> 4
    }
}

/// Pack values into the word-aligned layout at the given width.
pub fn pack_values(values: &[u16], bits_per_entry: u32) -> Vec<i64> {
    if values.is_empty() || bits_per_entry == 0 || bits_per_entry > 32 {
        return Vec::new();
    }
    let entries_per_word = (64 / bits_per_entry) as usize;
    let num_words = (values.len() + entries_per_word - 1) / entries_per_word;
    let value_mask = mask(bits_per_entry);

    let mut packed = vec![0i64; num_words];
    for (i, &value) in values.iter().enumerate() {
        let word_index = i / entries_per_word;
        let bit_offset = (i % entries_per_word) as u32 * bits_per_entry;
        packed[word_index] |= (((value as u64) & value_mask) << bit_offset) as i64;
    }
    packed
}

/// Pack values into the spanning layout at the given width.
pub fn pack_values_spanning(values: &[u16], bits_per_entry: u32) -> Vec<i64> {
    if values.is_empty() || bits_per_entry == 0 || bits_per_entry > 32 {
        return Vec::new();
    }
    let bits = bits_per_entry as usize;
    let num_words = (values.len() * bits + 63) / 64;
    let value_mask = mask(bits_per_entry);

    let mut packed = vec![0i64; num_words];
    for (i, &value) in values.iter().enumerate() {
        let value = (value as u64) & value_mask;
        let bit_index = i * bits;
        let start_word_index = bit_index / 64;
        let end_word_index = (bit_index + bits - 1) / 64;
        let start_offset = (bit_index % 64) as u32;

        packed[start_word_index] |= (value << start_offset) as i64;
        if end_word_index != start_word_index {
            packed[end_word_index] |= (value >> (64 - start_offset)) as i64;
        }
    }
    packed
}

fn mask(bits_per_entry: u32) -> u64 {
    if bits_per_entry >= 64 {
        u64::MAX
    } else {
        (1u64 << bits_per_entry) - 1
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

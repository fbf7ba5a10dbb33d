/// Max bytes in any text field (codes, names, titles, labels, ...).
pub const MAX_TEXT_LEN: usize = 256;

/// Max records held in a single collection.
pub const MAX_RECORDS_PER_COLLECTION: usize = 100_000;

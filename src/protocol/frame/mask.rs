#[inline]
pub fn generate() -> [u8; 4] {
    rand::random()
}

/// XOR each byte against the key, cycling every 4 bytes.
/// Masking and unmasking are the same operation.
#[inline]
pub fn apply_mask(buf: &mut [u8], mask: [u8; 4]) {
    for (i, byte) in buf.iter_mut().enumerate() {
        *byte ^= mask[i & 3];
    }
}

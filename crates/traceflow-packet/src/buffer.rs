/// A borrowed packet buffer, either read-only or writable.
#[derive(Debug)]
pub enum Buffer<'a> {
    Immutable(&'a [u8]),
    Mutable(&'a mut [u8]),
}

impl Buffer<'_> {
    /// The whole buffer as a byte slice.
    pub fn as_slice(&self) -> &[u8] {
        match self {
            Buffer::Immutable(bytes) => bytes,
            Buffer::Mutable(bytes) => bytes,
        }
    }

    /// The whole buffer as a mutable byte slice.
    ///
    /// Panics for a read-only buffer; only packets built with `new` write.
    pub fn as_slice_mut(&mut self) -> &mut [u8] {
        match self {
            Buffer::Immutable(_) => panic!("write to read-only packet buffer"),
            Buffer::Mutable(bytes) => bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn read(&self, offset: usize) -> u8 {
        self.as_slice()[offset]
    }

    pub fn write(&mut self, offset: usize, value: u8) {
        self.as_slice_mut()[offset] = value;
    }

    /// Read a big-endian `u16` at `offset`.
    pub fn read_u16(&self, offset: usize) -> u16 {
        u16::from_be_bytes(self.read_array(offset))
    }

    /// Write `value` as a big-endian `u16` at `offset`.
    pub fn write_u16(&mut self, offset: usize, value: u16) {
        self.write_array(offset, value.to_be_bytes());
    }

    pub fn read_array<const N: usize>(&self, offset: usize) -> [u8; N] {
        let bytes = self.as_slice();
        core::array::from_fn(|i| bytes[offset + i])
    }

    pub fn write_array<const N: usize>(&mut self, offset: usize, value: [u8; N]) {
        self.as_slice_mut()[offset..offset + N].copy_from_slice(&value);
    }

    /// The bytes from `offset` to the end, or an empty slice if `offset` is
    /// past the end.
    pub fn tail(&self, offset: usize) -> &[u8] {
        let bytes = self.as_slice();
        &bytes[offset.min(bytes.len())..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_only_access() {
        let bytes = [0x12, 0x34, 0x56];
        let buffer = Buffer::Immutable(&bytes);
        assert_eq!(3, buffer.len());
        assert_eq!(0x56, buffer.read(2));
        assert_eq!(0x1234, buffer.read_u16(0));
        assert_eq!([0x34, 0x56], buffer.read_array(1));
    }

    #[test]
    fn test_writable_access() {
        let mut bytes = [0_u8; 4];
        let mut buffer = Buffer::Mutable(&mut bytes);
        buffer.write(0, 0xff);
        buffer.write_u16(1, 0xbeef);
        buffer.write_array(3, [0x07]);
        assert_eq!(&[0xff, 0xbe, 0xef, 0x07], buffer.as_slice());
    }

    #[test]
    fn test_tail_is_clamped() {
        let bytes = [1, 2, 3];
        let buffer = Buffer::Immutable(&bytes);
        assert_eq!(&[2, 3], buffer.tail(1));
        assert!(buffer.tail(3).is_empty());
        assert!(buffer.tail(60).is_empty());
    }

    #[test]
    #[should_panic(expected = "write to read-only packet buffer")]
    fn test_read_only_rejects_write() {
        let bytes = [0_u8; 2];
        let mut buffer = Buffer::Immutable(&bytes);
        buffer.write_u16(0, 1);
    }
}

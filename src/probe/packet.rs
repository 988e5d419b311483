/// Raw counter value as the probe writes it into its map.
///
/// `len_ifindex` packs the interface index into the upper 16 bits and the packet length into the
/// lower 16 bits.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PacketInfo {
    pub hash: u32,
    pub len_ifindex: u32,
    pub timestamp: u64,
}

// SAFETY: `PacketInfo` is `repr(C)`, made only of integers and has no padding.
unsafe impl aya::Pod for PacketInfo {}

/// Decoded fields of one [`PacketInfo`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoded {
    pub timestamp: u64,
    pub hash: u32,
    pub if_index: u32,
    pub length: u32,
}

impl PacketInfo {
    /// Builds a value the way the probe packs it. Only the low 16 bits of both fields are kept.
    pub fn new(timestamp: u64, hash: u32, if_index: u32, length: u32) -> Self {
        Self {
            hash,
            len_ifindex: ((if_index & 0xFFFF) << 16) | (length & 0xFFFF),
            timestamp,
        }
    }

    /// Splits the packed word.
    ///
    /// # Arguments
    ///
    /// * `native_length` - The probe stored the length in host order; its two bytes are swapped.
    pub fn decode(&self, native_length: bool) -> Decoded {
        let raw = self.len_ifindex & 0xFFFF;
        let length = if native_length {
            u32::from((raw as u16).swap_bytes())
        } else {
            raw
        };

        Decoded {
            timestamp: self.timestamp,
            hash: self.hash,
            if_index: self.len_ifindex >> 16,
            length,
        }
    }
}

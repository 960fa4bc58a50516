//! Raw 32-bit record builders.
//!
//! The encoder writes PicoHarp T3 words through these; the HydraHarp
//! builders exist to produce test streams for the decoders.

/// PicoHarp T3 word layout.
pub mod picoharp {
    /// Channel value of special (marker/overflow) records.
    pub const SPECIAL_CHANNEL: u8 = 15;

    /// Packs the four PicoHarp T3 fields.
    ///
    /// `markers` shares bits with the low nibble of `dtime`; special records
    /// set one or the other.
    #[inline]
    #[must_use]
    pub fn make_record(nsync: u64, channel: u8, markers: u8, dtime: u16) -> u32 {
        #[allow(clippy::cast_possible_truncation)]
        let nsync = (nsync & 0xFFFF) as u32;
        nsync
            | ((u32::from(dtime) & 0xFFF) << 16)
            | ((u32::from(channel) & 0xF) << 28)
            | ((u32::from(markers) & 0xF) << 16)
    }

    /// Photon on `channel` with arrival bin `dtime`.
    #[must_use]
    pub fn photon(nsync: u64, channel: u8, dtime: u16) -> u32 {
        make_record(nsync, channel, 0, dtime)
    }

    /// Marker with a 4-bit marker code.
    #[must_use]
    pub fn marker(nsync: u64, code: u8) -> u32 {
        make_record(nsync, SPECIAL_CHANNEL, code, 0)
    }

    /// One 65536-tick overflow.
    #[must_use]
    pub fn overflow() -> u32 {
        make_record(0, SPECIAL_CHANNEL, 0, 0)
    }
}

/// HydraHarp T3 word layout (v1 and v2 share it).
pub mod hydraharp {
    /// Channel value of overflow records.
    pub const OVERFLOW_CHANNEL: u8 = 63;

    const SPECIAL: u32 = 1 << 31;

    fn pack(special: bool, channel: u8, dtime: u16, nsync: u16) -> u32 {
        let special = if special { SPECIAL } else { 0 };
        special
            | ((u32::from(channel) & 0x3F) << 25)
            | ((u32::from(dtime) & 0x7FFF) << 10)
            | (u32::from(nsync) & 0x3FF)
    }

    /// Photon on 1-based `channel`; the wire field holds `channel - 1`.
    #[must_use]
    pub fn photon(nsync: u16, channel: u8, dtime: u16) -> u32 {
        pack(false, channel.saturating_sub(1), dtime, nsync)
    }

    /// Marker with code `1..=15`.
    #[must_use]
    pub fn marker(nsync: u16, code: u8) -> u32 {
        pack(true, code, 0, nsync)
    }

    /// Overflow record; v2 files count `count` wraparounds.
    #[must_use]
    pub fn overflow(count: u16) -> u32 {
        pack(true, OVERFLOW_CHANNEL, 0, count)
    }
}

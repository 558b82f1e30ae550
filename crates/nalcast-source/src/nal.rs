//! H.264 NAL unit helpers for producers.
//!
//! The read path forwards queue items untouched. These helpers are for the
//! side that fills the queue: splitting an Annex-B byte stream into units,
//! recognising parameter sets, and building the SPS/PPS prefix a session
//! delivers before the first frame.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::NalError;

/// Four-byte Annex-B start code.
pub const START_CODE: [u8; 4] = [0, 0, 0, 1];

/// H.264 NAL unit types (ITU-T H.264 Table 7-1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NalUnitType {
    /// Coded slice of a non-IDR picture
    NonIdrSlice,
    /// Coded slice data partition A
    PartitionA,
    PartitionB,
    PartitionC,
    /// Coded slice of an IDR picture
    IdrSlice,
    /// Supplemental enhancement information
    Sei,
    /// Sequence parameter set
    Sps,
    /// Picture parameter set
    Pps,
    /// Access unit delimiter
    Aud,
    EndOfSequence,
    EndOfStream,
    Filler,
    SpsExtension,
    Unknown(u8),
}

impl From<u8> for NalUnitType {
    fn from(value: u8) -> Self {
        match value {
            1 => NalUnitType::NonIdrSlice,
            2 => NalUnitType::PartitionA,
            3 => NalUnitType::PartitionB,
            4 => NalUnitType::PartitionC,
            5 => NalUnitType::IdrSlice,
            6 => NalUnitType::Sei,
            7 => NalUnitType::Sps,
            8 => NalUnitType::Pps,
            9 => NalUnitType::Aud,
            10 => NalUnitType::EndOfSequence,
            11 => NalUnitType::EndOfStream,
            12 => NalUnitType::Filler,
            13 => NalUnitType::SpsExtension,
            v => NalUnitType::Unknown(v),
        }
    }
}

impl NalUnitType {
    /// Whether the unit carries coded picture data.
    pub fn is_vcl(self) -> bool {
        matches!(
            self,
            NalUnitType::NonIdrSlice
                | NalUnitType::PartitionA
                | NalUnitType::PartitionB
                | NalUnitType::PartitionC
                | NalUnitType::IdrSlice
        )
    }

    pub fn is_parameter_set(self) -> bool {
        matches!(self, NalUnitType::Sps | NalUnitType::Pps)
    }

    pub fn name(self) -> &'static str {
        match self {
            NalUnitType::NonIdrSlice => "slice",
            NalUnitType::PartitionA => "partition-a",
            NalUnitType::PartitionB => "partition-b",
            NalUnitType::PartitionC => "partition-c",
            NalUnitType::IdrSlice => "idr",
            NalUnitType::Sei => "sei",
            NalUnitType::Sps => "sps",
            NalUnitType::Pps => "pps",
            NalUnitType::Aud => "aud",
            NalUnitType::EndOfSequence => "end-of-seq",
            NalUnitType::EndOfStream => "end-of-stream",
            NalUnitType::Filler => "filler",
            NalUnitType::SpsExtension => "sps-ext",
            NalUnitType::Unknown(_) => "unknown",
        }
    }
}

/// A NAL unit borrowed from an Annex-B buffer.
#[derive(Debug, Clone, Copy)]
pub struct NalUnit<'a> {
    pub nal_type: NalUnitType,
    pub nal_ref_idc: u8,
    /// Offset of the first header byte in the source buffer.
    pub offset: usize,
    /// Unit bytes without start code, header included.
    pub data: &'a [u8],
}

impl<'a> NalUnit<'a> {
    /// Parse the one-byte header at the front of `data`.
    pub fn parse(data: &'a [u8], offset: usize) -> Result<Self, NalError> {
        let header = *data.first().ok_or(NalError::NoStartCode(0))?;
        if header & 0x80 != 0 {
            return Err(NalError::ForbiddenBit(offset));
        }
        Ok(Self {
            nal_type: NalUnitType::from(header & 0x1F),
            nal_ref_idc: (header >> 5) & 0x03,
            offset,
            data,
        })
    }

    /// The unit prefixed with a four-byte start code, ready to queue.
    pub fn to_annex_b(&self) -> Bytes {
        with_start_code(self.data)
    }
}

/// Prefix `unit` with a four-byte start code.
pub fn with_start_code(unit: &[u8]) -> Bytes {
    let mut out = BytesMut::with_capacity(START_CODE.len() + unit.len());
    out.put_slice(&START_CODE);
    out.put_slice(unit);
    out.freeze()
}

/// Split an Annex-B stream on 3- and 4-byte start codes.
///
/// Bytes before the first start code are ignored. Empty units (two
/// adjacent start codes) are skipped.
pub fn split_annex_b(data: &[u8]) -> Result<Vec<NalUnit<'_>>, NalError> {
    // (payload start, start code position)
    let mut starts = Vec::new();
    let mut i = 0;

    while i + 2 < data.len() {
        if data[i] == 0 && data[i + 1] == 0 {
            if data[i + 2] == 1 {
                starts.push((i + 3, i));
                i += 3;
                continue;
            } else if i + 3 < data.len() && data[i + 2] == 0 && data[i + 3] == 1 {
                starts.push((i + 4, i));
                i += 4;
                continue;
            }
        }
        i += 1;
    }

    if starts.is_empty() {
        return Err(NalError::NoStartCode(data.len()));
    }

    let mut units = Vec::with_capacity(starts.len());
    for (idx, &(start, _)) in starts.iter().enumerate() {
        let end = starts
            .get(idx + 1)
            .map(|&(_, code_pos)| code_pos)
            .unwrap_or(data.len());

        if start < end {
            units.push(NalUnit::parse(&data[start..end], start)?);
        }
    }

    Ok(units)
}

/// Tracks the most recent SPS and PPS in a stream.
#[derive(Debug, Clone, Default)]
pub struct ParameterSets {
    sps: Option<Bytes>,
    pps: Option<Bytes>,
}

impl ParameterSets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `unit` if it is a parameter set. Returns `true` if it was.
    pub fn observe(&mut self, unit: &NalUnit<'_>) -> bool {
        match unit.nal_type {
            NalUnitType::Sps => {
                self.sps = Some(Bytes::copy_from_slice(unit.data));
                true
            }
            NalUnitType::Pps => {
                self.pps = Some(Bytes::copy_from_slice(unit.data));
                true
            }
            _ => false,
        }
    }

    /// Both an SPS and a PPS have been seen.
    pub fn is_complete(&self) -> bool {
        self.sps.is_some() && self.pps.is_some()
    }

    /// The decoder prefix: start code + SPS, then start code + PPS.
    pub fn to_annex_b(&self) -> Option<Bytes> {
        let (sps, pps) = (self.sps.as_ref()?, self.pps.as_ref()?);

        let mut out = BytesMut::with_capacity(2 * START_CODE.len() + sps.len() + pps.len());
        out.put_slice(&START_CODE);
        out.put_slice(sps);
        out.put_slice(&START_CODE);
        out.put_slice(pps);
        Some(out.freeze())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STREAM: &[u8] = &[
        0, 0, 0, 1, 0x67, 0x42, 0x00, 0x1f, // SPS
        0, 0, 1, 0x68, 0xce, 0x3c, 0x80, // PPS, 3-byte start code
        0, 0, 0, 1, 0x65, 0x88, 0x84, // IDR
        0, 0, 0, 1, 0x41, 0x9a, // non-IDR
    ];

    #[test]
    fn test_nal_type_from_u8() {
        assert_eq!(NalUnitType::from(7), NalUnitType::Sps);
        assert_eq!(NalUnitType::from(5), NalUnitType::IdrSlice);
        assert_eq!(NalUnitType::from(24), NalUnitType::Unknown(24));
        assert!(NalUnitType::IdrSlice.is_vcl());
        assert!(!NalUnitType::Sei.is_vcl());
    }

    #[test]
    fn test_split_annex_b() {
        let units = split_annex_b(STREAM).unwrap();
        let types: Vec<_> = units.iter().map(|u| u.nal_type).collect();
        assert_eq!(
            types,
            vec![
                NalUnitType::Sps,
                NalUnitType::Pps,
                NalUnitType::IdrSlice,
                NalUnitType::NonIdrSlice
            ]
        );
        assert_eq!(units[0].data, &[0x67, 0x42, 0x00, 0x1f]);
        assert_eq!(units[1].data, &[0x68, 0xce, 0x3c, 0x80]);
        assert_eq!(units[2].nal_ref_idc, 3);
        assert_eq!(units[3].data, &[0x41, 0x9a]);
    }

    #[test]
    fn test_split_without_start_code() {
        assert!(matches!(
            split_annex_b(&[0x65, 0x88]),
            Err(NalError::NoStartCode(2))
        ));
    }

    #[test]
    fn test_forbidden_bit() {
        assert!(matches!(
            split_annex_b(&[0, 0, 1, 0x85, 0x00]),
            Err(NalError::ForbiddenBit(3))
        ));
    }

    #[test]
    fn test_parameter_sets_prefix() {
        let mut sets = ParameterSets::new();
        assert!(sets.to_annex_b().is_none());

        for unit in split_annex_b(STREAM).unwrap() {
            sets.observe(&unit);
        }
        assert!(sets.is_complete());

        let prefix = sets.to_annex_b().unwrap();
        assert_eq!(
            &prefix[..],
            &[0, 0, 0, 1, 0x67, 0x42, 0x00, 0x1f, 0, 0, 0, 1, 0x68, 0xce, 0x3c, 0x80]
        );
    }

    #[test]
    fn test_with_start_code() {
        assert_eq!(&with_start_code(&[0x09, 0xf0])[..], &[0, 0, 0, 1, 0x09, 0xf0]);
    }
}

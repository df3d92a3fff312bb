use crate::core_transfer::error::TransferError;

/// `[kind:u8][transfer_id:u32 BE][seq:u32 BE]`
pub const HEADER_LEN: usize = 9;

const KIND_DATA: u8 = 1;
const KIND_END: u8 = 2;
const KIND_HELLO: u8 = 3;

/// A datagram of the framed wire mode.
///
/// HELLO is the receiver's handshake and names the transfer id it will
/// accept. DATA frames carry one file chunk. The END frame's `seq` is the
/// number of DATA frames sent and its payload the total file length, so the
/// receiver can tell a finished transfer from a stalled one.
#[derive(Debug, PartialEq, Eq)]
pub enum Frame<'a> {
    Data {
        transfer_id: u32,
        seq: u32,
        payload: &'a [u8],
    },
    End {
        transfer_id: u32,
        seq: u32,
        total_len: u64,
    },
    Hello {
        transfer_id: u32,
    },
}

impl<'a> Frame<'a> {
    pub fn transfer_id(&self) -> u32 {
        match self {
            Frame::Data { transfer_id, .. }
            | Frame::End { transfer_id, .. }
            | Frame::Hello { transfer_id } => *transfer_id,
        }
    }

    pub fn decode(datagram: &'a [u8]) -> Result<Self, TransferError> {
        if datagram.len() < HEADER_LEN {
            return Err(TransferError::MalformedFrame(format!(
                "datagram of {} bytes is shorter than the header",
                datagram.len()
            )));
        }

        let transfer_id = u32::from_be_bytes([datagram[1], datagram[2], datagram[3], datagram[4]]);
        let seq = u32::from_be_bytes([datagram[5], datagram[6], datagram[7], datagram[8]]);
        let body = &datagram[HEADER_LEN..];

        match datagram[0] {
            KIND_DATA => Ok(Frame::Data {
                transfer_id,
                seq,
                payload: body,
            }),
            KIND_END => {
                let total: [u8; 8] = body.try_into().map_err(|_| {
                    TransferError::MalformedFrame(format!(
                        "END frame body has {} bytes, expected 8",
                        body.len()
                    ))
                })?;
                Ok(Frame::End {
                    transfer_id,
                    seq,
                    total_len: u64::from_be_bytes(total),
                })
            }
            KIND_HELLO => Ok(Frame::Hello { transfer_id }),
            kind => Err(TransferError::MalformedFrame(format!(
                "unknown frame kind {}",
                kind
            ))),
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Frame::Data {
                transfer_id,
                seq,
                payload,
            } => {
                let mut out = vec![0u8; HEADER_LEN + payload.len()];
                write_data_header(&mut out, *transfer_id, *seq);
                out[HEADER_LEN..].copy_from_slice(payload);
                out
            }
            Frame::End {
                transfer_id,
                seq,
                total_len,
            } => {
                let mut out = Vec::with_capacity(HEADER_LEN + 8);
                out.push(KIND_END);
                out.extend_from_slice(&transfer_id.to_be_bytes());
                out.extend_from_slice(&seq.to_be_bytes());
                out.extend_from_slice(&total_len.to_be_bytes());
                out
            }
            Frame::Hello { transfer_id } => {
                let mut out = Vec::with_capacity(HEADER_LEN);
                out.push(KIND_HELLO);
                out.extend_from_slice(&transfer_id.to_be_bytes());
                out.extend_from_slice(&0u32.to_be_bytes());
                out
            }
        }
    }
}

/// Writes a DATA header in place so the sender can read chunks straight
/// into `buf[HEADER_LEN..]`.
pub fn write_data_header(buf: &mut [u8], transfer_id: u32, seq: u32) {
    buf[0] = KIND_DATA;
    buf[1..5].copy_from_slice(&transfer_id.to_be_bytes());
    buf[5..9].copy_from_slice(&seq.to_be_bytes());
}

use bodycheck_util::{buffer::Buffer, debug::AsciiDebug};
use tracing::debug;

use crate::{
    BodyError, BodyReadResult, BodyResult, ChunkFault, ChunkProgress,
    parse_trailers::TrailerParser,
};

/// Longest chunk-size line (digits plus extensions) we are willing to buffer.
const MAX_CHUNK_HEADER_LEN: usize = 4096;
/// Longest trailer section we are willing to buffer.
const MAX_TRAILERS_LEN: usize = 16 * 1024;

#[derive(Debug, Clone, Copy)]
enum ChunkDecoderState {
    InChunkHeader,
    InChunkBody { declared: u64, remaining: u64 },
    InChunkFooterNeedCR { declared: u64 },
    InChunkFooterNeedLF { declared: u64 },
    InTrailers { parser: TrailerParser, consumed: usize },
    Done,
}

/// Decodes a `transfer-encoding: chunked` body. Every chunk's declared size
/// must be delivered in full and followed by CRLF, otherwise the whole body
/// is rejected.
#[derive(Debug)]
pub(crate) struct ChunkDecoder {
    state: ChunkDecoderState,
    /// payload bytes handed out so far, across all chunks
    body_bytes: u64,
}

impl ChunkDecoder {
    pub(crate) fn new() -> Self {
        Self {
            state: ChunkDecoderState::InChunkHeader,
            body_bytes: 0,
        }
    }

    pub(crate) fn read_bytes(
        &mut self,
        max_len: usize,
        buffer: &mut Buffer,
    ) -> BodyResult<BodyReadResult> {
        loop {
            match &mut self.state {
                ChunkDecoderState::InChunkHeader => {
                    let body_bytes = self.body_bytes;
                    let status = httparse::parse_chunk_size(buffer).map_err(|_| {
                        debug!(line = ?AsciiDebug::new(&buffer[..]), "invalid chunk size line");
                        framing_error(0, 0, body_bytes, ChunkFault::InvalidSize)
                    })?;
                    match status {
                        httparse::Status::Complete((body_at, declared)) => {
                            let _chunk_header = buffer.split_to(body_at);
                            debug!(declared, "chunk header");
                            self.state = if declared == 0 {
                                ChunkDecoderState::InTrailers {
                                    parser: TrailerParser::default(),
                                    consumed: 0,
                                }
                            } else {
                                ChunkDecoderState::InChunkBody {
                                    declared,
                                    remaining: declared,
                                }
                            };
                        }
                        httparse::Status::Partial if buffer.len() > MAX_CHUNK_HEADER_LEN => {
                            return Err(framing_error(
                                0,
                                0,
                                self.body_bytes,
                                ChunkFault::InvalidSize,
                            ));
                        }
                        httparse::Status::Partial => return Ok(BodyReadResult::NeedRead),
                    }
                }
                ChunkDecoderState::InChunkBody {
                    declared,
                    remaining,
                } => {
                    if *remaining == 0 {
                        self.state = ChunkDecoderState::InChunkFooterNeedCR {
                            declared: *declared,
                        };
                    } else if buffer.is_empty() {
                        return Ok(BodyReadResult::NeedRead);
                    } else {
                        let at = (*remaining).min(buffer.len() as u64).min(max_len as u64);
                        *remaining -= at;
                        self.body_bytes += at;
                        let body_buf = buffer.split_to(at as usize);
                        return Ok(BodyReadResult::DidRead(body_buf.freeze()));
                    }
                }
                ChunkDecoderState::InChunkFooterNeedCR { declared } => {
                    let declared = *declared;
                    match buffer.try_get_u8() {
                        Ok(b'\r') => {
                            self.state = ChunkDecoderState::InChunkFooterNeedLF { declared };
                        }
                        Ok(_) => return Err(self.invalid_footer(declared)),
                        Err(_) => return Ok(BodyReadResult::NeedRead),
                    }
                }
                ChunkDecoderState::InChunkFooterNeedLF { declared } => {
                    let declared = *declared;
                    match buffer.try_get_u8() {
                        Ok(b'\n') => self.state = ChunkDecoderState::InChunkHeader,
                        Ok(_) => return Err(self.invalid_footer(declared)),
                        Err(_) => return Ok(BodyReadResult::NeedRead),
                    }
                }
                ChunkDecoderState::InTrailers { parser, consumed } => match parser.feed(buffer) {
                    Ok(httparse::Status::Complete(end_at)) => {
                        let _trailers = buffer.split_to(end_at);
                        self.state = ChunkDecoderState::Done;
                        return Ok(BodyReadResult::Complete);
                    }
                    Ok(httparse::Status::Partial) => {
                        // the parser has seen every buffered byte, so drop them
                        *consumed += buffer.len();
                        let _trailers = buffer.split_to(buffer.len());
                        if *consumed > MAX_TRAILERS_LEN {
                            return Err(self.invalid_trailers());
                        }
                        return Ok(BodyReadResult::NeedRead);
                    }
                    Err(e) => {
                        debug!(error = %e, "invalid trailer section");
                        return Err(self.invalid_trailers());
                    }
                },
                ChunkDecoderState::Done => return Ok(BodyReadResult::Complete),
            }
        }
    }

    /// The stream stopped delivering bytes before the terminal chunk was
    /// read. Whatever chunk was in flight is reported as truncated.
    pub(crate) fn interrupted(&self) -> BodyError {
        let (declared, available) = match self.state {
            ChunkDecoderState::InChunkBody {
                declared,
                remaining,
            } => (declared, declared - remaining),
            ChunkDecoderState::InChunkFooterNeedCR { declared }
            | ChunkDecoderState::InChunkFooterNeedLF { declared } => (declared, declared),
            ChunkDecoderState::InChunkHeader
            | ChunkDecoderState::InTrailers { .. }
            | ChunkDecoderState::Done => (0, 0),
        };
        framing_error(declared, available, self.body_bytes, ChunkFault::Truncated)
    }

    pub(crate) fn body_bytes(&self) -> u64 {
        self.body_bytes
    }

    pub(crate) fn chunk(&self) -> Option<ChunkProgress> {
        match self.state {
            ChunkDecoderState::InChunkBody {
                declared,
                remaining,
            } => Some(ChunkProgress {
                declared,
                read: declared - remaining,
            }),
            ChunkDecoderState::InChunkFooterNeedCR { declared }
            | ChunkDecoderState::InChunkFooterNeedLF { declared } => Some(ChunkProgress {
                declared,
                read: declared,
            }),
            _ => None,
        }
    }

    fn invalid_footer(&self, declared: u64) -> BodyError {
        framing_error(declared, declared, self.body_bytes, ChunkFault::InvalidFooter)
    }

    fn invalid_trailers(&self) -> BodyError {
        framing_error(0, 0, self.body_bytes, ChunkFault::InvalidTrailer)
    }
}

fn framing_error(declared: u64, available: u64, received: u64, fault: ChunkFault) -> BodyError {
    BodyError::ChunkFraming {
        declared,
        available,
        received,
        fault,
    }
}

use crate::decoder::{CharDecoder, DecodeOutcome, DecodeStep};

/// UTF-8 decoding with SIMD validation of the input: valid runs are validated in
/// bulk and only the bytes around an invalid sequence take the slow path.
pub(crate) fn decode(
    decoder: &mut CharDecoder,
    input: &[u8],
    output: &mut Vec<char>,
    last: bool,
) -> DecodeStep {
    let mut pos = 0;
    while pos < input.len() {
        let rest = &input[pos..];
        match simdutf8::compat::from_utf8(rest) {
            Ok(valid) => {
                output.extend(valid.chars());
                pos = input.len();
            }
            Err(e) => {
                let valid_up_to = e.valid_up_to();
                // SAFETY: `valid_up_to` bytes were just validated as UTF-8.
                let valid = unsafe { std::str::from_utf8_unchecked(&rest[..valid_up_to]) };
                output.extend(valid.chars());
                pos += valid_up_to;

                let length = match e.error_len() {
                    Some(length) => length,
                    None if !last => {
                        return DecodeStep {
                            consumed: pos,
                            outcome: DecodeOutcome::Incomplete,
                        };
                    }
                    None => input.len() - pos,
                };
                if let Some(step) = decoder.on_malformed(pos, length, output) {
                    return step;
                }
                pos += length;
            }
        }
    }
    DecodeStep {
        consumed: pos,
        outcome: DecodeOutcome::Complete,
    }
}
